//! Pascal-VOC XML annotations to YOLO label files.

use anyhow::Result;
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::config::XmlConvertConfig;
use crate::dataset::{file_name_of, list_files_with_extensions, require_dir, LABEL_EXTENSION};
use crate::label::{write_label_file, BoundingBox};
use crate::report::{log_outcome, BatchStats, ItemOutcome};

#[derive(Debug, thiserror::Error)]
pub enum VocError {
    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("missing <{0}> element")]
    MissingElement(&'static str),
    #[error("<{field}> is not a number: '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("image size {0}x{1} has no area")]
    ZeroSize(f64, f64),
}

/// Pixel-space box of one annotated object
#[derive(Debug, Clone, PartialEq)]
pub struct VocObject {
    pub name: String,
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VocAnnotation {
    pub width: f64,
    pub height: f64,
    pub objects: Vec<VocObject>,
}

/// Class name to YOLO class id
#[derive(Debug, Clone, Default)]
pub struct ClassMap {
    ids: HashMap<String, u32>,
}

impl ClassMap {
    /// Ids are assigned by position in `names`
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let ids = names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.as_ref().to_string(), id as u32))
            .collect();
        Self { ids }
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &'static str) -> Result<Node<'a, 'input>, VocError> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .ok_or(VocError::MissingElement(name))
}

fn child_text<'a>(node: Node<'a, '_>, name: &'static str) -> Result<&'a str, VocError> {
    Ok(child(node, name)?.text().unwrap_or("").trim())
}

fn child_number(node: Node<'_, '_>, name: &'static str) -> Result<f64, VocError> {
    let text = child_text(node, name)?;
    text.parse::<f64>().map_err(|_| VocError::InvalidNumber {
        field: name,
        value: text.to_string(),
    })
}

/// Parse the `<annotation>` document of one image
pub fn parse_voc(xml: &str) -> Result<VocAnnotation, VocError> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();

    let size = child(root, "size")?;
    let width = child_number(size, "width")?;
    let height = child_number(size, "height")?;
    if width <= 0.0 || height <= 0.0 {
        return Err(VocError::ZeroSize(width, height));
    }

    let mut objects = Vec::new();
    for obj in root.children().filter(|n| n.has_tag_name("object")) {
        let name = child_text(obj, "name")?.to_string();
        let bndbox = child(obj, "bndbox")?;
        objects.push(VocObject {
            name,
            xmin: child_number(bndbox, "xmin")?,
            ymin: child_number(bndbox, "ymin")?,
            xmax: child_number(bndbox, "xmax")?,
            ymax: child_number(bndbox, "ymax")?,
        });
    }

    Ok(VocAnnotation {
        width,
        height,
        objects,
    })
}

/// Convert to normalized YOLO boxes; objects with unmapped names are returned separately
pub fn to_yolo_boxes(annotation: &VocAnnotation, classes: &ClassMap) -> (Vec<BoundingBox>, Vec<String>) {
    let mut boxes = Vec::new();
    let mut unknown = Vec::new();

    for obj in &annotation.objects {
        let Some(class_id) = classes.get(&obj.name) else {
            unknown.push(obj.name.clone());
            continue;
        };
        boxes.push(BoundingBox::new(
            class_id,
            (obj.xmin + obj.xmax) / 2.0 / annotation.width,
            (obj.ymin + obj.ymax) / 2.0 / annotation.height,
            (obj.xmax - obj.xmin) / annotation.width,
            (obj.ymax - obj.ymin) / annotation.height,
        ));
    }

    (boxes, unknown)
}

/// Convert every `*.xml` of `config.dir` into a sibling `*.txt` label file
pub fn convert_directory(config: &XmlConvertConfig) -> Result<BatchStats> {
    require_dir(&config.dir)?;
    let classes = ClassMap::from_names(&config.classes);
    let mut stats = BatchStats::new();

    for xml_path in list_files_with_extensions(&config.dir, &["xml"])? {
        let outcome = convert_file(&xml_path, &classes, &mut stats);
        log_outcome(&file_name_of(&xml_path), &outcome);
        stats.record(&outcome);
    }

    Ok(stats)
}

fn convert_file(xml_path: &Path, classes: &ClassMap, stats: &mut BatchStats) -> ItemOutcome {
    let txt_path = xml_path.with_extension(LABEL_EXTENSION);
    if txt_path.exists() {
        return ItemOutcome::Skipped(format!("{:?} already exists", txt_path));
    }

    let annotation = match fs::read_to_string(xml_path)
        .map_err(|e| e.to_string())
        .and_then(|xml| parse_voc(&xml).map_err(|e| e.to_string()))
    {
        Ok(annotation) => annotation,
        Err(e) => return ItemOutcome::Failed(e),
    };

    let (boxes, unknown) = to_yolo_boxes(&annotation, classes);
    for name in &unknown {
        log::warn!("Class '{}' is not in the class list, object skipped", name);
    }
    stats.dropped_entries += unknown.len();

    match write_label_file(&txt_path, &boxes) {
        Ok(()) => ItemOutcome::Processed,
        Err(e) => ItemOutcome::Failed(format!("cannot write {:?}: {}", txt_path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<annotation>
  <filename>img1.jpg</filename>
  <size><width>200</width><height>100</height><depth>3</depth></size>
  <object>
    <name>tree</name>
    <bndbox><xmin>50</xmin><ymin>25</ymin><xmax>150</xmax><ymax>75</ymax></bndbox>
  </object>
  <object>
    <name>car</name>
    <bndbox><xmin>0</xmin><ymin>0</ymin><xmax>10</xmax><ymax>10</ymax></bndbox>
  </object>
</annotation>"#;

    #[test]
    fn test_parse_voc() {
        let ann = parse_voc(SAMPLE).unwrap();
        assert_eq!(ann.width, 200.0);
        assert_eq!(ann.height, 100.0);
        assert_eq!(ann.objects.len(), 2);
        assert_eq!(ann.objects[1].name, "car");
        assert_eq!(ann.objects[0].xmax, 150.0);
    }

    #[test]
    fn test_unknown_class_is_dropped() {
        let ann = parse_voc(SAMPLE).unwrap();
        let classes = ClassMap::from_names(&["tree"]);
        let (boxes, unknown) = to_yolo_boxes(&ann, &classes);
        assert_eq!(boxes, vec![BoundingBox::new(0, 0.5, 0.5, 0.5, 0.5)]);
        assert_eq!(unknown, vec!["car".to_string()]);
    }

    #[test]
    fn test_class_ids_follow_name_order() {
        let classes = ClassMap::from_names(&["car", "tree"]);
        assert_eq!(classes.get("car"), Some(0));
        assert_eq!(classes.get("tree"), Some(1));
        assert_eq!(classes.get("bike"), None);
    }

    #[test]
    fn test_missing_size_is_error() {
        let err = parse_voc("<annotation><object/></annotation>").unwrap_err();
        assert!(matches!(err, VocError::MissingElement("size")));
    }

    #[test]
    fn test_bad_number_is_error() {
        let xml = "<annotation><size><width>abc</width><height>10</height></size></annotation>";
        assert!(matches!(
            parse_voc(xml),
            Err(VocError::InvalidNumber { field: "width", .. })
        ));
    }

    #[test]
    fn test_malformed_xml_is_error() {
        assert!(matches!(parse_voc("<annotation>"), Err(VocError::Xml(_))));
    }
}
