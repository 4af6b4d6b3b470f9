//! Reader and writer collaborators codecs talk to, plus in-memory implementations.

use crate::bson::{Binary, Bson, BsonType, Document, ObjectId};
use crate::decimal::Decimal128;
use crate::error::{CodecError, Result};

/// Receives a value one element at a time.
///
/// Inside a document every value must be preceded by [`BsonWriter::write_name`].
pub trait BsonWriter {
    fn write_start_document(&mut self) -> Result<()>;
    fn write_end_document(&mut self) -> Result<()>;
    fn write_start_array(&mut self) -> Result<()>;
    fn write_end_array(&mut self) -> Result<()>;
    fn write_name(&mut self, name: &str) -> Result<()>;
    fn write_int32(&mut self, value: i32) -> Result<()>;
    fn write_int64(&mut self, value: i64) -> Result<()>;
    fn write_double(&mut self, value: f64) -> Result<()>;
    fn write_decimal128(&mut self, value: Decimal128) -> Result<()>;
    fn write_boolean(&mut self, value: bool) -> Result<()>;
    /// Milliseconds since the Unix epoch.
    fn write_date_time(&mut self, millis: i64) -> Result<()>;
    fn write_string(&mut self, value: &str) -> Result<()>;
    fn write_binary(&mut self, value: &Binary) -> Result<()>;
    fn write_object_id(&mut self, value: ObjectId) -> Result<()>;
    fn write_symbol(&mut self, value: &str) -> Result<()>;
    fn write_null(&mut self) -> Result<()>;

    /// Writes an arbitrary value structurally.
    fn write_value(&mut self, value: &Bson) -> Result<()> {
        match value {
            Bson::Double(v) => self.write_double(*v),
            Bson::String(v) => self.write_string(v),
            Bson::Document(doc) => {
                self.write_start_document()?;
                for (name, v) in doc.iter() {
                    self.write_name(name)?;
                    self.write_value(v)?;
                }
                self.write_end_document()
            }
            Bson::Array(items) => {
                self.write_start_array()?;
                for item in items {
                    self.write_value(item)?;
                }
                self.write_end_array()
            }
            Bson::Binary(v) => self.write_binary(v),
            Bson::Boolean(v) => self.write_boolean(*v),
            Bson::DateTime(v) => self.write_date_time(*v),
            Bson::Null => self.write_null(),
            Bson::Int32(v) => self.write_int32(*v),
            Bson::Int64(v) => self.write_int64(*v),
            Bson::Decimal128(v) => self.write_decimal128(*v),
            Bson::ObjectId(v) => self.write_object_id(*v),
            Bson::Symbol(v) => self.write_symbol(v),
        }
    }
}

/// Cursor over a value.
///
/// Inside a container, [`BsonReader::read_bson_type`] advances to the next
/// element and returns [`BsonType::EndOfDocument`] once there are none left.
/// Typed reads consume the value at the cursor and fail with a format error
/// when its physical type differs.
pub trait BsonReader {
    /// Type of the value at the cursor without consuming it.
    fn current_bson_type(&mut self) -> Result<BsonType>;
    fn read_bson_type(&mut self) -> Result<BsonType>;
    fn read_name(&mut self) -> Result<String>;
    fn read_start_document(&mut self) -> Result<()>;
    fn read_end_document(&mut self) -> Result<()>;
    fn read_start_array(&mut self) -> Result<()>;
    fn read_end_array(&mut self) -> Result<()>;
    fn read_int32(&mut self) -> Result<i32>;
    fn read_int64(&mut self) -> Result<i64>;
    fn read_double(&mut self) -> Result<f64>;
    fn read_decimal128(&mut self) -> Result<Decimal128>;
    fn read_boolean(&mut self) -> Result<bool>;
    fn read_date_time(&mut self) -> Result<i64>;
    fn read_string(&mut self) -> Result<String>;
    fn read_binary(&mut self) -> Result<Binary>;
    fn read_object_id(&mut self) -> Result<ObjectId>;
    fn read_symbol(&mut self) -> Result<String>;
    fn read_null(&mut self) -> Result<()>;
    fn skip_value(&mut self) -> Result<()>;
    /// Reads the value at the cursor structurally.
    fn read_value(&mut self) -> Result<Bson>;
}

enum WriteFrame {
    Document {
        document: Document,
        name: Option<String>,
    },
    Array(Vec<Bson>),
}

/// Builds a [`Bson`] tree.
///
/// The value only becomes available once every document and array has been
/// closed, so an encode that fails halfway never yields a partial value.
#[derive(Default)]
pub struct DocumentWriter {
    stack: Vec<WriteFrame>,
    root: Option<Bson>,
}

impl DocumentWriter {
    pub fn new() -> Self {
        DocumentWriter::default()
    }

    /// The finished value.
    pub fn into_bson(self) -> Result<Bson> {
        if !self.stack.is_empty() {
            return Err(CodecError::format("value is incomplete: unclosed document or array"));
        }
        self.root
            .ok_or_else(|| CodecError::format("nothing was written"))
    }

    fn emit(&mut self, value: Bson) -> Result<()> {
        match self.stack.last_mut() {
            None => {
                if self.root.is_some() {
                    return Err(CodecError::format("a top-level value was already written"));
                }
                self.root = Some(value);
            }
            Some(WriteFrame::Document { document, name }) => {
                let Some(name) = name.take() else {
                    return Err(CodecError::format("value written inside a document without a name"));
                };
                document.insert(name, value);
            }
            Some(WriteFrame::Array(items)) => items.push(value),
        }
        Ok(())
    }
}

impl BsonWriter for DocumentWriter {
    fn write_start_document(&mut self) -> Result<()> {
        if let Some(WriteFrame::Document { name: None, .. }) = self.stack.last() {
            return Err(CodecError::format("document started without a name"));
        }
        self.stack.push(WriteFrame::Document {
            document: Document::new(),
            name: None,
        });
        Ok(())
    }

    fn write_end_document(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(WriteFrame::Document { document, name: None }) => self.emit(Bson::Document(document)),
            Some(WriteFrame::Document { name: Some(name), .. }) => Err(CodecError::format(format!(
                "document ended after name `{name}` without a value"
            ))),
            _ => Err(CodecError::format("write_end_document without a matching start")),
        }
    }

    fn write_start_array(&mut self) -> Result<()> {
        if let Some(WriteFrame::Document { name: None, .. }) = self.stack.last() {
            return Err(CodecError::format("array started without a name"));
        }
        self.stack.push(WriteFrame::Array(Vec::new()));
        Ok(())
    }

    fn write_end_array(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(WriteFrame::Array(items)) => self.emit(Bson::Array(items)),
            _ => Err(CodecError::format("write_end_array without a matching start")),
        }
    }

    fn write_name(&mut self, name: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(WriteFrame::Document { name: slot @ None, .. }) => {
                *slot = Some(name.to_string());
                Ok(())
            }
            Some(WriteFrame::Document { .. }) => {
                Err(CodecError::format(format!("name `{name}` written twice in a row")))
            }
            _ => Err(CodecError::format(format!("name `{name}` written outside a document"))),
        }
    }

    fn write_int32(&mut self, value: i32) -> Result<()> {
        self.emit(Bson::Int32(value))
    }

    fn write_int64(&mut self, value: i64) -> Result<()> {
        self.emit(Bson::Int64(value))
    }

    fn write_double(&mut self, value: f64) -> Result<()> {
        self.emit(Bson::Double(value))
    }

    fn write_decimal128(&mut self, value: Decimal128) -> Result<()> {
        self.emit(Bson::Decimal128(value))
    }

    fn write_boolean(&mut self, value: bool) -> Result<()> {
        self.emit(Bson::Boolean(value))
    }

    fn write_date_time(&mut self, millis: i64) -> Result<()> {
        self.emit(Bson::DateTime(millis))
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.emit(Bson::String(value.to_string()))
    }

    fn write_binary(&mut self, value: &Binary) -> Result<()> {
        self.emit(Bson::Binary(value.clone()))
    }

    fn write_object_id(&mut self, value: ObjectId) -> Result<()> {
        self.emit(Bson::ObjectId(value))
    }

    fn write_symbol(&mut self, value: &str) -> Result<()> {
        self.emit(Bson::Symbol(value.to_string()))
    }

    fn write_null(&mut self) -> Result<()> {
        self.emit(Bson::Null)
    }

    fn write_value(&mut self, value: &Bson) -> Result<()> {
        self.emit(value.clone())
    }
}

fn mismatch(expected: BsonType, found: &Bson) -> CodecError {
    CodecError::format(format!(
        "expected BsonType {expected} but found {}",
        found.bson_type()
    ))
}

enum ReadFrame {
    Document(std::vec::IntoIter<(String, Bson)>),
    Array(std::vec::IntoIter<Bson>),
}

/// Reads from an owned [`Bson`] tree.
pub struct DocumentReader {
    stack: Vec<ReadFrame>,
    current: Option<Bson>,
    name: Option<String>,
}

impl DocumentReader {
    pub fn new(value: Bson) -> Self {
        DocumentReader {
            stack: Vec::new(),
            current: Some(value),
            name: None,
        }
    }

    fn take(&mut self, expected: BsonType) -> Result<Bson> {
        match self.current.take() {
            Some(value) if value.bson_type() == expected => {
                self.name = None;
                Ok(value)
            }
            Some(value) => {
                let err = mismatch(expected, &value);
                self.current = Some(value);
                Err(err)
            }
            None => Err(CodecError::format(format!(
                "expected BsonType {expected} but no value is at the cursor"
            ))),
        }
    }
}

impl BsonReader for DocumentReader {
    fn current_bson_type(&mut self) -> Result<BsonType> {
        self.current
            .as_ref()
            .map(Bson::bson_type)
            .ok_or_else(|| CodecError::format("no value at the cursor"))
    }

    fn read_bson_type(&mut self) -> Result<BsonType> {
        if let Some(value) = &self.current {
            return Ok(value.bson_type());
        }
        match self.stack.last_mut() {
            Some(ReadFrame::Document(fields)) => match fields.next() {
                Some((name, value)) => {
                    let bson_type = value.bson_type();
                    self.name = Some(name);
                    self.current = Some(value);
                    Ok(bson_type)
                }
                None => Ok(BsonType::EndOfDocument),
            },
            Some(ReadFrame::Array(items)) => match items.next() {
                Some(value) => {
                    let bson_type = value.bson_type();
                    self.current = Some(value);
                    Ok(bson_type)
                }
                None => Ok(BsonType::EndOfDocument),
            },
            None => Err(CodecError::format("read past the end of the value")),
        }
    }

    fn read_name(&mut self) -> Result<String> {
        self.name
            .take()
            .ok_or_else(|| CodecError::format("no element name at the cursor"))
    }

    fn read_start_document(&mut self) -> Result<()> {
        let document = match self.take(BsonType::Document)? {
            Bson::Document(document) => document,
            other => return Err(mismatch(BsonType::Document, &other)),
        };
        self.stack
            .push(ReadFrame::Document(document.into_iter().collect::<Vec<_>>().into_iter()));
        Ok(())
    }

    fn read_end_document(&mut self) -> Result<()> {
        match self.stack.last() {
            Some(ReadFrame::Document(fields)) if fields.len() == 0 && self.current.is_none() => {
                self.stack.pop();
                Ok(())
            }
            Some(ReadFrame::Document(_)) => {
                Err(CodecError::format("document has unread elements"))
            }
            _ => Err(CodecError::format("read_end_document outside a document")),
        }
    }

    fn read_start_array(&mut self) -> Result<()> {
        let items = match self.take(BsonType::Array)? {
            Bson::Array(items) => items,
            other => return Err(mismatch(BsonType::Array, &other)),
        };
        self.stack.push(ReadFrame::Array(items.into_iter()));
        Ok(())
    }

    fn read_end_array(&mut self) -> Result<()> {
        match self.stack.last() {
            Some(ReadFrame::Array(items)) if items.len() == 0 && self.current.is_none() => {
                self.stack.pop();
                Ok(())
            }
            Some(ReadFrame::Array(_)) => Err(CodecError::format("array has unread elements")),
            _ => Err(CodecError::format("read_end_array outside an array")),
        }
    }

    fn read_int32(&mut self) -> Result<i32> {
        match self.take(BsonType::Int32)? {
            Bson::Int32(v) => Ok(v),
            other => Err(mismatch(BsonType::Int32, &other)),
        }
    }

    fn read_int64(&mut self) -> Result<i64> {
        match self.take(BsonType::Int64)? {
            Bson::Int64(v) => Ok(v),
            other => Err(mismatch(BsonType::Int64, &other)),
        }
    }

    fn read_double(&mut self) -> Result<f64> {
        match self.take(BsonType::Double)? {
            Bson::Double(v) => Ok(v),
            other => Err(mismatch(BsonType::Double, &other)),
        }
    }

    fn read_decimal128(&mut self) -> Result<Decimal128> {
        match self.take(BsonType::Decimal128)? {
            Bson::Decimal128(v) => Ok(v),
            other => Err(mismatch(BsonType::Decimal128, &other)),
        }
    }

    fn read_boolean(&mut self) -> Result<bool> {
        match self.take(BsonType::Boolean)? {
            Bson::Boolean(v) => Ok(v),
            other => Err(mismatch(BsonType::Boolean, &other)),
        }
    }

    fn read_date_time(&mut self) -> Result<i64> {
        match self.take(BsonType::DateTime)? {
            Bson::DateTime(v) => Ok(v),
            other => Err(mismatch(BsonType::DateTime, &other)),
        }
    }

    fn read_string(&mut self) -> Result<String> {
        match self.take(BsonType::String)? {
            Bson::String(v) => Ok(v),
            other => Err(mismatch(BsonType::String, &other)),
        }
    }

    fn read_binary(&mut self) -> Result<Binary> {
        match self.take(BsonType::Binary)? {
            Bson::Binary(v) => Ok(v),
            other => Err(mismatch(BsonType::Binary, &other)),
        }
    }

    fn read_object_id(&mut self) -> Result<ObjectId> {
        match self.take(BsonType::ObjectId)? {
            Bson::ObjectId(v) => Ok(v),
            other => Err(mismatch(BsonType::ObjectId, &other)),
        }
    }

    fn read_symbol(&mut self) -> Result<String> {
        match self.take(BsonType::Symbol)? {
            Bson::Symbol(v) => Ok(v),
            other => Err(mismatch(BsonType::Symbol, &other)),
        }
    }

    fn read_null(&mut self) -> Result<()> {
        self.take(BsonType::Null).map(|_| ())
    }

    fn skip_value(&mut self) -> Result<()> {
        self.read_value().map(|_| ())
    }

    fn read_value(&mut self) -> Result<Bson> {
        self.name = None;
        self.current
            .take()
            .ok_or_else(|| CodecError::format("no value at the cursor"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn writer_builds_nested_documents() {
        let mut w = DocumentWriter::new();
        w.write_start_document().unwrap();
        w.write_name("a").unwrap();
        w.write_int32(1).unwrap();
        w.write_name("b").unwrap();
        w.write_start_array().unwrap();
        w.write_string("x").unwrap();
        w.write_null().unwrap();
        w.write_end_array().unwrap();
        w.write_end_document().unwrap();

        let expected = doc! {
            "a" => 1i32,
            "b" => vec![Bson::from("x"), Bson::Null],
        };
        assert_eq!(w.into_bson().unwrap(), Bson::Document(expected));
    }

    #[test]
    fn writer_withholds_unfinished_documents() {
        let mut w = DocumentWriter::new();
        w.write_start_document().unwrap();
        w.write_name("a").unwrap();
        w.write_int32(1).unwrap();
        assert!(w.into_bson().is_err());
    }

    #[test]
    fn writer_requires_names_inside_documents() {
        let mut w = DocumentWriter::new();
        w.write_start_document().unwrap();
        assert!(w.write_int32(1).is_err());
        assert!(w.write_value(&Bson::Null).is_err());
    }

    #[test]
    fn reader_walks_document_elements() {
        let mut r = DocumentReader::new(Bson::Document(doc! { "a" => 1i32, "b" => "x" }));
        r.read_start_document().unwrap();
        assert_eq!(r.read_bson_type().unwrap(), BsonType::Int32);
        assert_eq!(r.read_name().unwrap(), "a");
        assert_eq!(r.read_int32().unwrap(), 1);
        assert_eq!(r.read_bson_type().unwrap(), BsonType::String);
        assert_eq!(r.read_name().unwrap(), "b");
        assert_eq!(r.read_string().unwrap(), "x");
        assert_eq!(r.read_bson_type().unwrap(), BsonType::EndOfDocument);
        r.read_end_document().unwrap();
    }

    #[test]
    fn reader_reports_type_mismatch_as_format_error() {
        let mut r = DocumentReader::new(Bson::String("x".into()));
        let err = r.read_int32().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Format);
        // the value is still there
        assert_eq!(r.read_string().unwrap(), "x");
    }

    #[test]
    fn reader_refuses_to_close_with_unread_elements() {
        let mut r = DocumentReader::new(Bson::Array(vec![Bson::Int32(1)]));
        r.read_start_array().unwrap();
        assert!(r.read_end_array().is_err());
        r.read_bson_type().unwrap();
        r.skip_value().unwrap();
        assert_eq!(r.read_bson_type().unwrap(), BsonType::EndOfDocument);
        r.read_end_array().unwrap();
    }
}
