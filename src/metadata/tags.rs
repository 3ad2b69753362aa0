use super::value::TagKey;

/// Numeric codes the decoder leaves unnamed but that still deserve a label.
const TAG_NAMES: &[(u32, &str)] = &[
    (34965, "Interoperability Index"),
    (34970, "GPS Info"),
    (39321, "Camera Settings"),
    (39424, "Camera Model"),
    (39594, "Unique Image ID"),
    (42593, "Image Unique ID"),
];

pub struct TagNameTable;

impl TagNameTable {
    pub fn lookup(code: u32) -> Option<&'static str> {
        TAG_NAMES
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, name)| *name)
    }

    /// Resolves a key to its label before spacing is applied.
    pub fn resolve(key: &TagKey) -> String {
        match key {
            TagKey::Name(name) => name.clone(),
            TagKey::Code(code) => match Self::lookup(*code) {
                Some(name) => name.to_string(),
                None => format!("Unknown Tag ({})", code),
            },
        }
    }
}

/// Inserts a space at every lowercase-to-uppercase boundary:
/// `DateTimeOriginal` becomes `Date Time Original`.
pub fn space_words(label: &str) -> String {
    let mut spaced = String::with_capacity(label.len() + 8);
    let mut prev: Option<char> = None;

    for c in label.chars() {
        if let Some(p) = prev {
            if p.is_ascii_lowercase() && c.is_ascii_uppercase() {
                spaced.push(' ');
            }
        }
        spaced.push(c);
        prev = Some(c);
    }

    spaced
}

/// Display key for a raw tag: resolved through the table, then spaced.
pub fn display_key(key: &TagKey) -> String {
    space_words(&TagNameTable::resolve(key))
}
