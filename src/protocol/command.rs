//! Command definitions
//!
//! A command is a top-level array whose first item is the keyword string;
//! the remaining items are its parameters, kept as-is.

use super::object::ProtocolObject;
use crate::error::SyntaxError;

/// A decoded client request
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    keyword: String,
    parameters: Vec<ProtocolObject>,
}

impl Command {
    /// Decode the object found at `index` of a parsed batch
    pub fn decode(index: usize, object: ProtocolObject) -> Result<Self, SyntaxError> {
        let items = match object {
            ProtocolObject::Array(items) => items,
            other => {
                return Err(SyntaxError::new(
                    format!(
                        "Expecting array type for command request at index {}, found {}",
                        index,
                        other.type_name()
                    ),
                    index,
                ))
            }
        };

        let mut items = items.into_iter();
        match items.next() {
            Some(ProtocolObject::String(keyword)) => Ok(Self {
                keyword,
                parameters: items.collect(),
            }),
            _ => Err(SyntaxError::new(
                format!(
                    "Expecting command keyword string at first item of the array at index {}",
                    index
                ),
                index,
            )),
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Case-insensitive keyword comparison
    pub fn is(&self, keyword: &str) -> bool {
        self.keyword.eq_ignore_ascii_case(keyword)
    }

    pub fn parameters(&self) -> &[ProtocolObject] {
        &self.parameters
    }

    pub fn parameter(&self, index: usize) -> Option<&ProtocolObject> {
        self.parameters.get(index)
    }

    /// Re-encode as the request envelope `[keyword, parameters...]`
    pub fn to_object(&self) -> ProtocolObject {
        let mut items = Vec::with_capacity(self.parameters.len() + 1);
        items.push(ProtocolObject::String(self.keyword.clone()));
        items.extend(self.parameters.iter().cloned());
        ProtocolObject::Array(items)
    }

    pub fn into_parts(self) -> (String, Vec<ProtocolObject>) {
        (self.keyword, self.parameters)
    }
}

/// Decode a parsed batch into commands, in order.
///
/// Pipelined requests are simply consecutive arrays; the first object that
/// is not a well-formed command fails the whole batch.
pub fn decode_commands<I>(objects: I) -> Result<Vec<Command>, SyntaxError>
where
    I: IntoIterator<Item = ProtocolObject>,
{
    objects
        .into_iter()
        .enumerate()
        .map(|(index, object)| Command::decode(index, object))
        .collect()
}
