//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Level2 datagram parsing.
//!
//! A datagram travels as `^Y(` payload `^Y)`. The payload is a
//! space-separated token list: the datagram id first, then one token per
//! field. String fields may be quoted, either as `{...}` or as
//! `^Y{...^Y}`; quoted content may contain spaces. Token conversion is
//! driven by the per-id schema in [`crate::schema`].

use crate::consts::{CTRL, DATAGRAM_END, DATAGRAM_START, STRING_END, STRING_START};
use crate::result::{CodecError, CodecResult};
use crate::schema::{self, FieldType};

const CTRL_CH: char = CTRL as char;

/// A single typed datagram field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DgField {
    /// Signed decimal integer field.
    Int(i32),
    /// `1`/`0` flag field.
    Bool(bool),
    /// Text field, unquoted.
    Str(String),
    /// Space-separated word list field.
    List(Vec<String>),
}

impl DgField {
    /// The schema type this value belongs to.
    pub fn field_type(&self) -> FieldType {
        match self {
            DgField::Int(_) => FieldType::Int,
            DgField::Bool(_) => FieldType::Bool,
            DgField::Str(_) => FieldType::Str,
            DgField::List(_) => FieldType::List,
        }
    }
}

/// A parsed level2 datagram: an id plus its ordered, typed fields.
/// Immutable once built.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Datagram {
    id: u16,
    fields: Vec<DgField>,
}

impl Datagram {
    /// Builds a datagram directly from typed fields. Intended for tests
    /// and server-side use; inbound datagrams come from [`Datagram::parse`].
    pub fn new(id: u16, fields: Vec<DgField>) -> Self {
        Datagram { id, fields }
    }

    /// The datagram type number.
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Raw access to a field.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn field(&self, index: usize) -> &DgField {
        &self.fields[index]
    }

    /// The integer field at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range or the field is not an integer.
    /// Asking for the wrong type is a caller bug against the published
    /// schema, not a runtime condition.
    pub fn int_at(&self, index: usize) -> i32 {
        match &self.fields[index] {
            DgField::Int(value) => *value,
            other => self.wrong_type(index, FieldType::Int, other),
        }
    }

    /// The boolean field at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range or the field is not a boolean.
    pub fn bool_at(&self, index: usize) -> bool {
        match &self.fields[index] {
            DgField::Bool(value) => *value,
            other => self.wrong_type(index, FieldType::Bool, other),
        }
    }

    /// The string field at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range or the field is not a string.
    pub fn string_at(&self, index: usize) -> &str {
        match &self.fields[index] {
            DgField::Str(value) => value,
            other => self.wrong_type(index, FieldType::Str, other),
        }
    }

    /// The string-list field at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range or the field is not a list.
    pub fn list_at(&self, index: usize) -> &[String] {
        match &self.fields[index] {
            DgField::List(value) => value,
            other => self.wrong_type(index, FieldType::List, other),
        }
    }

    fn wrong_type(&self, index: usize, wanted: FieldType, got: &DgField) -> ! {
        panic!(
            "datagram {} field {} is {}, not {}",
            self.id,
            index,
            got.field_type(),
            wanted
        );
    }

    /// Parses a datagram payload: the text between the `^Y(` and `^Y)`
    /// markers, delimiters already stripped by the stream reader.
    pub fn parse(payload: &str) -> CodecResult<Datagram> {
        let chars: Vec<char> = payload.chars().collect();
        let mut pos = 0usize;

        let id_token = next_token(&chars, &mut pos)?.ok_or_else(|| {
            CodecError::MalformedDatagram {
                id: None,
                reason: "empty datagram payload".into(),
            }
        })?;
        let id: u16 = id_token
            .parse()
            .map_err(|_| CodecError::MalformedDatagram {
                id: None,
                reason: format!("datagram id {:?} is not a decimal number", id_token),
            })?;

        let types = schema::field_types(id).ok_or(CodecError::UnknownDatagram(id))?;

        let mut fields = Vec::with_capacity(types.len());
        for &field_type in types {
            let token = next_token(&chars, &mut pos)
                .map_err(|err| at_id(err, id))?
                .ok_or_else(|| CodecError::MalformedDatagram {
                    id: Some(id),
                    reason: format!("expected {} fields, got {}", types.len(), fields.len()),
                })?;
            fields.push(convert(id, token, field_type)?);
        }
        if let Some(extra) = next_token(&chars, &mut pos).map_err(|err| at_id(err, id))? {
            return Err(CodecError::MalformedDatagram {
                id: Some(id),
                reason: format!(
                    "expected {} fields, found extra token {:?}",
                    types.len(),
                    extra
                ),
            });
        }

        Ok(Datagram { id, fields })
    }

    /// Renders the full wire form of this datagram, including the `^Y(`
    /// and `^Y)` markers. String and list fields are emitted in the
    /// `^Y{...^Y}` quoted form, which survives embedded spaces and
    /// braces.
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        out.push(CTRL_CH);
        out.push(DATAGRAM_START as char);
        out.push_str(&self.id.to_string());
        for field in &self.fields {
            out.push(' ');
            match field {
                DgField::Int(value) => out.push_str(&value.to_string()),
                DgField::Bool(value) => out.push(if *value { '1' } else { '0' }),
                DgField::Str(value) => push_quoted(&mut out, value),
                DgField::List(words) => push_quoted(&mut out, &words.join(" ")),
            }
        }
        out.push(CTRL_CH);
        out.push(DATAGRAM_END as char);
        out
    }
}

impl std::fmt::Display for Datagram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Datagram ID={} Fields:", self.id)?;
        if self.fields.is_empty() {
            write!(f, " None")?;
        } else {
            for (index, field) in self.fields.iter().enumerate() {
                let sep = if index == 0 { ' ' } else { ',' };
                match field {
                    DgField::Int(value) => write!(f, "{}{{{}}}", sep, value)?,
                    DgField::Bool(value) => write!(f, "{}{{{}}}", sep, value)?,
                    DgField::Str(value) => write!(f, "{}{{{}}}", sep, value)?,
                    DgField::List(words) => write!(f, "{}{{{}}}", sep, words.join(" "))?,
                }
            }
        }
        write!(f, "]")
    }
}

fn push_quoted(out: &mut String, text: &str) {
    out.push(CTRL_CH);
    out.push(STRING_START as char);
    out.push_str(text);
    out.push(CTRL_CH);
    out.push(STRING_END as char);
}

fn at_id(err: CodecError, id: u16) -> CodecError {
    match err {
        CodecError::MalformedDatagram { id: None, reason } => {
            CodecError::MalformedDatagram { id: Some(id), reason }
        }
        other => other,
    }
}

/// Pulls the next raw token from the payload, honoring both quoted-string
/// forms. Returns `Ok(None)` at end of payload.
fn next_token(chars: &[char], pos: &mut usize) -> CodecResult<Option<String>> {
    while *pos < chars.len() && chars[*pos] == ' ' {
        *pos += 1;
    }
    if *pos >= chars.len() {
        return Ok(None);
    }

    let start_ch = STRING_START as char;
    let end_ch = STRING_END as char;

    // ^Y{ ... ^Y} quoted string
    if chars[*pos] == CTRL_CH && chars.get(*pos + 1) == Some(&start_ch) {
        let mut index = *pos + 2;
        while index + 1 < chars.len() {
            if chars[index] == CTRL_CH && chars[index + 1] == end_ch {
                let token: String = chars[*pos + 2..index].iter().collect();
                *pos = index + 2;
                return Ok(Some(token));
            }
            index += 1;
        }
        return Err(unterminated());
    }

    // { ... } quoted string
    if chars[*pos] == start_ch {
        let mut index = *pos + 1;
        while index < chars.len() {
            if chars[index] == end_ch {
                let token: String = chars[*pos + 1..index].iter().collect();
                *pos = index + 1;
                return Ok(Some(token));
            }
            index += 1;
        }
        return Err(unterminated());
    }

    // Bare token, runs to the next space
    let start = *pos;
    while *pos < chars.len() && chars[*pos] != ' ' {
        *pos += 1;
    }
    Ok(Some(chars[start..*pos].iter().collect()))
}

fn unterminated() -> CodecError {
    CodecError::MalformedDatagram {
        id: None,
        reason: "unterminated quoted string field".into(),
    }
}

fn convert(id: u16, token: String, field_type: FieldType) -> CodecResult<DgField> {
    match field_type {
        FieldType::Int => token
            .parse::<i32>()
            .map(DgField::Int)
            .map_err(|_| CodecError::MalformedDatagram {
                id: Some(id),
                reason: format!("{:?} is not an integer", token),
            }),
        FieldType::Bool => match token.as_str() {
            "1" => Ok(DgField::Bool(true)),
            "0" => Ok(DgField::Bool(false)),
            other => Err(CodecError::MalformedDatagram {
                id: Some(id),
                reason: format!("{:?} is not a boolean flag", other),
            }),
        },
        FieldType::Str => Ok(DgField::Str(token)),
        FieldType::List => Ok(DgField::List(
            token.split_whitespace().map(String::from).collect(),
        )),
    }
}
