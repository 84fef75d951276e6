use serde_json::{Map, Value};

/// A single data submission as it arrives on the wire.
#[derive(Debug, Clone, Default)]
pub struct Entry {
    pub id: String,
    pub user_id: String,
    pub payload: String,
}

impl Entry {
    /// Decodes the first JSON value in `body`; anything after it is ignored.
    ///
    /// Keys `id`, `userID` and `data` match in any letter case, and when a
    /// field appears more than once the last occurrence wins. Missing fields,
    /// `null` fields and a `null` body leave empty strings. Unknown keys are
    /// ignored, but a known key holding anything other than a string or
    /// `null` fails the decode.
    pub fn decode(body: &[u8]) -> Option<Self> {
        let object = serde_json::Deserializer::from_slice(body)
            .into_iter::<Option<Map<String, Value>>>()
            .next()?
            .ok()?;

        let mut entry = Self::default();
        for (key, value) in object.into_iter().flatten() {
            let field = match key.to_lowercase().as_str() {
                "id" => &mut entry.id,
                "userid" => &mut entry.user_id,
                "data" => &mut entry.payload,
                _ => continue,
            };
            match value {
                Value::String(text) => *field = text,
                Value::Null => {}
                _ => return None,
            }
        }
        Some(entry)
    }
}
