use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Pixel box `[y_min, x_min, y_max, x_max]`, top-left origin, y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub y_min: i64,
    pub x_min: i64,
    pub y_max: i64,
    pub x_max: i64,
}

impl BoundingBox {
    pub fn new(y_min: i64, x_min: i64, y_max: i64, x_max: i64) -> Self {
        Self { y_min, x_min, y_max, x_max }
    }

    pub fn is_ordered(&self) -> bool {
        self.y_min <= self.y_max && self.x_min <= self.x_max
    }

    /// Clamp y into `[0, height]` and x into `[0, width]`. Ordering is left alone.
    pub fn clamped(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as i64, height as i64);
        Self {
            y_min: self.y_min.clamp(0, h),
            x_min: self.x_min.clamp(0, w),
            y_max: self.y_max.clamp(0, h),
            x_max: self.x_max.clamp(0, w),
        }
    }
}

/// Box exactly as the model returned it. Anything but 4 components is malformed.
/// Fractional coordinates are rounded to the nearest pixel on input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RawBox(pub Vec<i64>);

#[derive(Deserialize)]
#[serde(untagged)]
enum Coord {
    Int(i64),
    Float(f64),
}

impl<'de> Deserialize<'de> for RawBox {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let coords = Vec::<Coord>::deserialize(deserializer)?;
        Ok(RawBox(
            coords
                .into_iter()
                .map(|c| match c {
                    Coord::Int(v) => v,
                    // saturating cast
                    Coord::Float(v) => v.round() as i64,
                })
                .collect(),
        ))
    }
}

impl RawBox {
    pub fn to_box(&self) -> Option<BoundingBox> {
        match self.0.as_slice() {
            &[y_min, x_min, y_max, x_max] => Some(BoundingBox::new(y_min, x_min, y_max, x_max)),
            _ => None,
        }
    }

    pub fn set(&mut self, b: BoundingBox) {
        self.0 = vec![b.y_min, b.x_min, b.y_max, b.x_max];
    }
}

impl From<BoundingBox> for RawBox {
    fn from(b: BoundingBox) -> Self {
        RawBox(vec![b.y_min, b.x_min, b.y_max, b.x_max])
    }
}

macro_rules! aria_roles {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Closed ARIA role vocabulary. Roles outside it are kept verbatim in `Other`.
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum AriaRole {
            $($variant,)+
            Other(String),
        }

        impl AriaRole {
            pub const KNOWN: &'static [&'static str] = &[$($name),+];

            pub fn as_str(&self) -> &str {
                match self {
                    $(AriaRole::$variant => $name,)+
                    AriaRole::Other(s) => s,
                }
            }

            pub fn parse(s: &str) -> Self {
                match s {
                    $($name => AriaRole::$variant,)+
                    other => AriaRole::Other(other.to_string()),
                }
            }
        }
    };
}

aria_roles! {
    // Interactive / widget
    Button => "button", Link => "link", Checkbox => "checkbox", Radio => "radio",
    Switch => "switch", Slider => "slider", Textbox => "textbox", Combobox => "combobox",
    Listbox => "listbox", Option => "option", Menu => "menu", MenuItem => "menuitem",
    MenuBar => "menubar", Tab => "tab", TabList => "tablist", TabPanel => "tabpanel",
    ProgressBar => "progressbar", ScrollBar => "scrollbar", SpinButton => "spinbutton",
    Tree => "tree", TreeItem => "treeitem",
    // Structure
    Img => "img", Heading => "heading", Label => "label", Paragraph => "paragraph",
    Code => "code", List => "list", ListItem => "listitem", Table => "table", Row => "row",
    Cell => "cell", ColumnHeader => "columnheader", RowHeader => "rowheader", Grid => "grid",
    GridCell => "gridcell", Separator => "separator", Figure => "figure", Group => "group",
    Generic => "generic",
    // Containers / landmarks
    Dialog => "dialog", AlertDialog => "alertdialog", Toolbar => "toolbar",
    Navigation => "navigation", Form => "form", Region => "region", Banner => "banner",
    Main => "main", Search => "search",
    // Status
    Alert => "alert", Status => "status", Tooltip => "tooltip",
}

impl AriaRole {
    pub fn is_known(&self) -> bool {
        !matches!(self, AriaRole::Other(_))
    }
}

impl Default for AriaRole {
    fn default() -> Self {
        AriaRole::Other(String::new())
    }
}

impl Serialize for AriaRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AriaRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(AriaRole::parse(&s))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    #[serde(default)]
    pub role: AriaRole,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bounding_box: RawBox,
    #[serde(default)]
    pub children: Vec<ElementNode>,
    /// Depth-first reference id, assigned after validation.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
}

impl ElementNode {
    pub fn new(role: AriaRole, name: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            role,
            name: name.into(),
            bounding_box: bbox.into(),
            children: Vec::new(),
            ref_id: None,
        }
    }

    pub fn with_children(mut self, children: Vec<ElementNode>) -> Self {
        self.children = children;
        self
    }
}

/// Top-level JSON document returned by the tree model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementTree {
    #[serde(default)]
    pub elements: Vec<ElementNode>,
}
