//! Build-descriptor reading (Maven `pom.xml`).

use std::collections::BTreeMap;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

use crate::error::{HealthError, Result};

/// File name read by [`PomReader`].
pub const POM_FILE: &str = "pom.xml";

/// `groupId:artifactId:version` of a parent or dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Group identifier.
    pub group_id: String,
    /// Artifact identifier.
    pub artifact_id: String,
    /// Version, possibly a `${property}` reference.
    pub version: Option<String>,
}

/// A declared dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Coordinates of the dependency.
    pub coordinates: Coordinates,
    /// Maven scope (`compile`, `test`, `import`, ...).
    pub scope: Option<String>,
    /// Packaging type (`jar`, `pom`, ...).
    pub kind: Option<String>,
}

/// Parsed content of a project descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDescriptor {
    /// Parent project.
    pub parent: Option<Coordinates>,
    /// Declared properties.
    pub properties: BTreeMap<String, String>,
    /// Direct dependencies.
    pub dependencies: Vec<Dependency>,
    /// Entries of the dependency-management section.
    pub dependency_management: Vec<Dependency>,
}

impl BuildDescriptor {
    /// Value of a declared property.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

/// Parses the build descriptor of a project directory.
pub trait DescriptorReader: Send + Sync {
    /// Read the descriptor located in `project_dir`.
    fn read(&self, project_dir: &Path) -> Result<BuildDescriptor>;
}

/// [`DescriptorReader`] for Maven projects.
#[derive(Debug, Default, Clone)]
pub struct PomReader;

impl PomReader {
    /// Create a new reader.
    pub fn new() -> Self {
        Self
    }
}

impl DescriptorReader for PomReader {
    fn read(&self, project_dir: &Path) -> Result<BuildDescriptor> {
        let path = project_dir.join(POM_FILE);
        if !path.is_file() {
            return Err(HealthError::Descriptor(format!(
                "no descriptor file in {}",
                project_dir.display()
            )));
        }
        parse_pom(&std::fs::read_to_string(&path)?)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Dependencies,
    Management,
}

/// Parse the text of a `pom.xml`.
pub fn parse_pom(contents: &str) -> Result<BuildDescriptor> {
    let mut reader = Reader::from_str(contents);
    reader.config_mut().trim_text(true);

    let mut descriptor = BuildDescriptor::default();
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<(Section, Dependency)> = None;

    loop {
        let event = reader.read_event().map_err(|err| {
            HealthError::Descriptor(format!(
                "could not parse descriptor at byte {}: {err}",
                reader.buffer_position()
            ))
        })?;
        match event {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                stack.push(name);
                if let Some(section) = dependency_section(&stack) {
                    current = Some((section, Dependency::default()));
                }
            }
            Event::Empty(empty) => {
                let name = String::from_utf8_lossy(empty.local_name().as_ref()).into_owned();
                if is_path(&stack, &["project", "properties"]) {
                    descriptor.properties.insert(name, String::new());
                }
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .map_err(|err| HealthError::Descriptor(format!("invalid text: {err}")))?
                    .into_owned();
                assign_text(&mut descriptor, &mut current, &stack, value);
            }
            Event::End(_) => {
                if dependency_section(&stack).is_some() {
                    if let Some((section, dependency)) = current.take() {
                        match section {
                            Section::Dependencies => descriptor.dependencies.push(dependency),
                            Section::Management => {
                                descriptor.dependency_management.push(dependency)
                            }
                        }
                    }
                }
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(HealthError::Descriptor(format!(
            "could not parse descriptor: unclosed <{}>",
            stack.join("/")
        )));
    }
    if descriptor == BuildDescriptor::default() && !contents.contains("<project") {
        return Err(HealthError::Descriptor(
            "could not parse descriptor: missing <project> element".to_string(),
        ));
    }
    Ok(descriptor)
}

fn is_path(stack: &[String], expected: &[&str]) -> bool {
    stack.len() == expected.len() && stack.iter().zip(expected).all(|(left, right)| left == right)
}

fn dependency_section(stack: &[String]) -> Option<Section> {
    if is_path(stack, &["project", "dependencies", "dependency"]) {
        Some(Section::Dependencies)
    } else if is_path(
        stack,
        &["project", "dependencyManagement", "dependencies", "dependency"],
    ) {
        Some(Section::Management)
    } else {
        None
    }
}

fn assign_text(
    descriptor: &mut BuildDescriptor,
    current: &mut Option<(Section, Dependency)>,
    stack: &[String],
    value: String,
) {
    let Some((leaf, parents)) = stack.split_last() else {
        return;
    };
    if is_path(parents, &["project", "properties"]) {
        descriptor.properties.insert(leaf.clone(), value);
    } else if is_path(parents, &["project", "parent"]) {
        let parent = descriptor.parent.get_or_insert_with(Coordinates::default);
        set_coordinate(parent, leaf, value);
    } else if dependency_section(parents).is_some() {
        if let Some((_, dependency)) = current.as_mut() {
            match leaf.as_str() {
                "scope" => dependency.scope = Some(value),
                "type" => dependency.kind = Some(value),
                _ => set_coordinate(&mut dependency.coordinates, leaf, value),
            }
        }
    }
}

fn set_coordinate(coordinates: &mut Coordinates, field: &str, value: String) {
    match field {
        "groupId" => coordinates.group_id = value,
        "artifactId" => coordinates.artifact_id = value,
        "version" => coordinates.version = Some(value),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::{DescriptorReader, PomReader, parse_pom};
    use crate::error::HealthError;
    use std::path::PathBuf;

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>org.jenkins-ci.plugins</groupId>
    <artifactId>plugin</artifactId>
    <version>4.80</version>
    <relativePath />
  </parent>
  <artifactId>mailer</artifactId>
  <properties>
    <jenkins.version>2.426.3</jenkins.version>
    <spotbugs.skip/>
    <changelist>999999-SNAPSHOT &amp; more</changelist>
  </properties>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>io.jenkins.tools.bom</groupId>
        <artifactId>bom-2.426.x</artifactId>
        <version>2815.vf5d6f093b_23e</version>
        <type>pom</type>
        <scope>import</scope>
      </dependency>
    </dependencies>
  </dependencyManagement>
  <dependencies>
    <dependency>
      <groupId>org.jenkins-ci.plugins</groupId>
      <artifactId>display-url-api</artifactId>
    </dependency>
    <dependency>
      <groupId>org.jenkins-ci.plugins</groupId>
      <artifactId>matrix-project</artifactId>
      <scope>test</scope>
    </dependency>
  </dependencies>
</project>
"#;

    #[test]
    fn parses_parent_properties_and_dependencies() {
        let descriptor = parse_pom(POM).expect("parse");

        let parent = descriptor.parent.as_ref().expect("parent");
        assert_eq!(parent.group_id, "org.jenkins-ci.plugins");
        assert_eq!(parent.artifact_id, "plugin");
        assert_eq!(parent.version.as_deref(), Some("4.80"));

        assert_eq!(descriptor.property("jenkins.version"), Some("2.426.3"));
        assert_eq!(descriptor.property("spotbugs.skip"), Some(""));
        assert_eq!(
            descriptor.property("changelist"),
            Some("999999-SNAPSHOT & more")
        );

        assert_eq!(descriptor.dependencies.len(), 2);
        assert_eq!(
            descriptor.dependencies[1].scope.as_deref(),
            Some("test")
        );
        assert_eq!(descriptor.dependency_management.len(), 1);
        let bom = &descriptor.dependency_management[0];
        assert_eq!(bom.coordinates.artifact_id, "bom-2.426.x");
        assert_eq!(bom.kind.as_deref(), Some("pom"));
        assert_eq!(bom.scope.as_deref(), Some("import"));
    }

    #[test]
    fn malformed_xml_is_a_descriptor_error() {
        let err = parse_pom("<project><parent></project>").unwrap_err();
        assert!(matches!(err, HealthError::Descriptor(_)));

        let err = parse_pom("<project><parent>").unwrap_err();
        assert!(matches!(err, HealthError::Descriptor(_)));

        let err = parse_pom("not xml at all").unwrap_err();
        assert!(err.to_string().contains("missing <project>"));
    }

    #[test]
    fn reader_requires_a_descriptor_file() {
        let root = std::env::temp_dir().join(unique_dir_name());
        std::fs::create_dir_all(&root).expect("create dir");
        let reader = PomReader::new();

        let err = reader.read(&root).unwrap_err();
        assert!(err.to_string().starts_with("no descriptor file"));

        std::fs::write(root.join("pom.xml"), POM).expect("write pom");
        let descriptor = reader.read(&root).expect("read");
        assert!(descriptor.parent.is_some());

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    fn unique_dir_name() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time")
            .as_nanos();
        PathBuf::from(format!("plugin_health_descriptor_test_{nanos}"))
    }
}
