use crate::types;
use headless_chrome::Element;
use std::fs;
use std::path::PathBuf;

/// Create `path` (and its parents) if it does not exist yet, then hand it back.
pub fn guarantee_dir_path(path: PathBuf) -> types::PathResult {
    fs::create_dir_all(&path)?;
    Ok(path)
}

/// Read a single attribute off a DOM element.
pub fn attribute(element: &Element, name: &str) -> types::OptionStringResult {
    let attributes = element.get_attributes()?.unwrap_or_default();
    Ok(find_attribute(&attributes, name))
}

/// Chrome hands attributes over as a flat `[name, value, name, value, ...]` list.
fn find_attribute(attributes: &[String], name: &str) -> Option<String> {
    attributes
        .chunks_exact(2)
        .find(|pair| pair[0] == name)
        .map(|pair| pair[1].clone())
}
