//! Prompt text and structured-output schema sent to the vision model.

use serde_json::{json, Value};

use crate::perception::types::AriaRole;

/// Nesting depth of the element schema (root + 4 child levels).
pub const TREE_SCHEMA_DEPTH: u32 = 4;

pub fn build_mark_prompt(description: &str) -> String {
    format!(
        "Add a bright magenta (#FF00FF) filled circle marker at the location of: {description}\n\
         \n\
         The circle should be approximately 15 pixels in diameter.\n\
         \n\
         CRITICAL INSTRUCTIONS:\n\
         - Preserve the entire original image content exactly\n\
         - Do not modify or remove any existing content\n\
         - Maintain original image quality and resolution\n\
         - Do not crop, resize, or significantly alter the image dimensions\n\
         - Add the marker as an overlay only\n\
         - The marker should be clearly visible and not blend with the background\n\
         - Place the marker at the CENTER of the described element/location"
    )
}

pub const TREE_SYSTEM_PROMPT: &str = r#"You are an accessibility tree generator. Analyze screenshots and produce structured accessibility trees that enable automation and screen reader access.

## Coordinate System
- Origin: (0, 0) is the TOP-LEFT corner of the image
- Format: [y_min, x_min, y_max, x_max] in PIXELS
- y_min: Top edge (smaller y value)
- y_max: Bottom edge (larger y value)
- x_min: Left edge (smaller x value)
- x_max: Right edge (larger x value)
- All values are integers

## Role Selection
Use ONLY roles from the provided schema enum. Common roles:
- `img`: Root element of charts, diagrams, visual components
- `group`: Containers (axes, legends, sections)
- `label`, `paragraph`, `heading`: Text elements (include verbatim text in name)
- `button`: Interactive buttons
- `link`: Clickable links
- `generic`: Data points, grid lines, decorative elements

## Hierarchical Analysis
1. Identify the root element encompassing the visual
2. Break down into major components (L1)
3. Decompose into sub-components (L2)
4. Identify fine-grained elements (L3)
5. Include atomic elements where meaningful (L4)

## Text Content
For text elements (paragraph, label, heading, code):
- Include the COMPLETE text verbatim in the name field
- Do not summarize or truncate

## Example
For a bar chart at coordinates [50, 100, 400, 600]:
```json
{
  "elements": [{
    "role": "img",
    "name": "Q1-Q4 Sales Chart",
    "bounding_box": [50, 100, 400, 600],
    "children": [{
      "role": "heading",
      "name": "Quarterly Revenue Report 2024",
      "bounding_box": [60, 250, 90, 450],
      "children": []
    }]
  }]
}
```

## Requirements
- Bounding boxes must be pixel-accurate
- Names must be descriptive for screen readers
- Hierarchy reflects visual containment
- Include all meaningful interactive elements"#;

pub fn build_tree_prompt(width: u32, height: u32, hint: Option<&str>) -> String {
    format!(
        "Analyze this {width}x{height} pixel screenshot and generate an accessibility tree.\n\
         \n\
         {hint}\n\
         \n\
         For each element:\n\
         1. Assign an appropriate ARIA role from the schema's enum\n\
         2. Provide a descriptive name:\n\
         \x20  - For text elements (paragraph, label, heading, code): include the complete text verbatim\n\
         \x20  - For other elements: a concise description for screen reader announcement\n\
         3. Specify bounding box as [y_min, x_min, y_max, x_max] in pixels\n\
         \n\
         Structure hierarchically (up to 5 levels) based on visual containment.\n\
         Focus on elements useful for automation and data extraction.",
        hint = hint.unwrap_or("")
    )
}

/// Response schema with the element type inlined `depth` levels deep;
/// the structured-output API does not accept `$ref`.
pub fn tree_response_schema(depth: u32) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "elements": {
                "type": "ARRAY",
                "items": element_schema(depth),
            }
        },
        "required": ["elements"],
    })
}

fn element_schema(depth: u32) -> Value {
    let mut schema = json!({
        "type": "OBJECT",
        "properties": {
            "role": { "type": "STRING", "enum": AriaRole::KNOWN },
            "name": { "type": "STRING" },
            "bounding_box": { "type": "ARRAY", "items": { "type": "INTEGER" } },
        },
        "required": ["role", "name", "bounding_box"],
    });
    if depth > 0 {
        schema["properties"]["children"] = json!({
            "type": "ARRAY",
            "items": element_schema(depth - 1),
        });
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nesting(schema: &Value) -> u32 {
        let mut depth = 0;
        let mut node = &schema["properties"]["elements"]["items"];
        while let Some(child) = node["properties"].get("children") {
            depth += 1;
            node = &child["items"];
        }
        depth
    }

    #[test]
    fn schema_nests_to_requested_depth() {
        assert_eq!(nesting(&tree_response_schema(4)), 4);
        assert_eq!(nesting(&tree_response_schema(0)), 0);
    }

    #[test]
    fn schema_lists_every_role() {
        let schema = tree_response_schema(1);
        let roles = schema["properties"]["elements"]["items"]["properties"]["role"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(roles.len(), 51);
        assert!(roles.iter().any(|r| r == "columnheader"));
        assert!(!schema.to_string().contains("$ref"));
    }

    #[test]
    fn prompts_embed_inputs() {
        assert!(build_mark_prompt("the Submit button").contains("location of: the Submit button"));
        let p = build_tree_prompt(800, 600, Some("This is a bar chart"));
        assert!(p.starts_with("Analyze this 800x600 pixel screenshot"));
        assert!(p.contains("This is a bar chart"));
        assert!(p.contains("   - For text elements"));
    }
}
