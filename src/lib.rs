pub(crate) mod diagram;
pub mod input;
pub mod model;
pub mod output;
pub mod registry;

use wasm_bindgen::prelude::*;

use input::Source;
use registry::Registry;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Convert diagram source text from one format to another
#[wasm_bindgen(js_name = "convertDiagram")]
pub fn convert_diagram(
    source: &str,
    from: &str,
    to: &str,
    database: Option<String>,
) -> Result<String, String> {
    Registry::default()
        .convert(Source::text(source), from, to, database.as_deref())
        .map_err(|e| e.to_string())
}

/// Identifiers of every input and output format
#[wasm_bindgen(js_name = "availableFormats")]
pub fn available_formats() -> js_sys::Array {
    let registry = Registry::default();
    let formats = js_sys::Array::new();
    for parser in registry.parsers() {
        formats.push(&JsValue::from_str(&format!("from:{}", parser.file_extension())));
    }
    for builder in registry.builders() {
        formats.push(&JsValue::from_str(&format!("to:{}", builder.file_extension())));
    }
    formats
}
