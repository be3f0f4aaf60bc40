//! The Wup envelope: a JCE `RequestPacket` plus a named attribute bag,
//! framed with a 4-byte length prefix.

use std::collections::HashMap;

use crate::io::{Reader, Writer};
use crate::jce::{Bytes, JceField, JceReader, JceWriter};
use crate::{Error, Result, jce_struct};

jce_struct! {
    /// The Taf RPC envelope record.
    pub struct RequestPacket("RequestPacket") {
        1 => version: i16 = 3,
        2 => packet_type: u8 = 0,
        3 => message_type: i32 = 0,
        4 => request_id: i32 = 0,
        5 => servant_name: String = String::new(),
        6 => func_name: String = String::new(),
        7 => buffer: Bytes = Bytes::new(),
        8 => timeout: i32 = 0,
        9 => context: HashMap<String, String> = HashMap::new(),
        10 => status: HashMap<String, String> = HashMap::new(),
    }
}

// ─── OldUniAttribute ─────────────────────────────────────────────────────────

/// A named bag of JCE-encoded values: `name → (type name → bytes)`.
///
/// `put` serializes the value at tag 0 and stores the bytes under the
/// type name derived from the Rust type; `get` requires the caller's
/// declared type to match what was stored.
#[derive(Clone, Debug, Default)]
pub struct OldUniAttribute {
    data: HashMap<String, HashMap<String, Bytes>>,
}

impl OldUniAttribute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: JceField>(&mut self, name: &str, value: &T) -> Result<()> {
        let mut buf = Vec::new();
        let mut w = Writer::growable(&mut buf);
        value.write_field(0, &mut JceWriter::new(&mut w))?;
        self.data
            .entry(name.to_string())
            .or_default()
            .insert(T::type_name(), Bytes(buf));
        Ok(())
    }

    pub fn get<T: JceField>(&self, name: &str) -> Result<T> {
        let entry = self.data.get(name).ok_or_else(|| Error::AttributeNotFound {
            name: name.to_string(),
        })?;
        let expected = T::type_name();
        let bytes = entry
            .get(&expected)
            .ok_or_else(|| Error::AttributeTypeMismatch {
                name: name.to_string(),
                expected,
            })?;
        let mut r = JceReader::new(bytes);
        T::read_field(0, &mut r)?.ok_or(Error::MissingField { name: "attribute value" })
    }

    /// Drop an entry; returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.data.remove(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<()> {
        self.data.write_field(0, &mut JceWriter::new(w))
    }

    pub fn decode(r: &mut JceReader<'_>) -> Result<Self> {
        let data = HashMap::read_field(0, r)?
            .ok_or(Error::MissingField { name: "attribute map" })?;
        Ok(Self { data })
    }
}

// ─── UniPacket ───────────────────────────────────────────────────────────────

/// A complete Wup packet: envelope record + attribute bag.
#[derive(Clone, Debug, Default)]
pub struct UniPacket {
    pub request: RequestPacket,
    pub attribute: OldUniAttribute,
}

impl UniPacket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize into `out`: 4-byte big-endian total length (including
    /// those four bytes), then the `RequestPacket` at tag 0 with the
    /// attribute bytes stuffed into its buffer field.
    pub fn encode(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let mut attr = Vec::new();
        {
            let mut w = Writer::growable(&mut attr);
            self.attribute.encode(&mut w)?;
        }
        self.request.buffer = Bytes(attr);

        let mut w = Writer::growable(out);
        let size_pos = w.position();
        w.write_u32_be(0)?;
        self.request.write_field(0, &mut JceWriter::new(&mut w))?;
        let end = w.position();
        w.seek(size_pos)?;
        w.write_u32_be((end - size_pos) as u32)?;
        w.seek(end)
    }

    /// Decode a packet from a full frame.
    ///
    /// The length prefix is redundant at this layer and only skipped.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let mut r = Reader::new(frame);
        r.skip(4)?;
        let mut jr = JceReader::from_reader(r);
        let request = RequestPacket::read_field(0, &mut jr)?
            .ok_or(Error::MissingField { name: "RequestPacket" })?;
        let attribute = {
            let mut jr = JceReader::new(&request.buffer);
            OldUniAttribute::decode(&mut jr)?
        };
        Ok(Self { request, attribute })
    }

    /// Start a reply packet carrying this request's routing fields.
    pub fn create_response(&self) -> Self {
        let mut response = Self::new();
        response.request.version = self.request.version;
        response.request.request_id = self.request.request_id;
        response.request.servant_name = self.request.servant_name.clone();
        response.request.func_name = self.request.func_name.clone();
        response
    }

    /// Encode in the legacy response layout: envelope fields and the
    /// attribute bytes written flat at tags 1–7 with a return code.
    pub fn encode_old_response(&self, ret: i32, out: &mut Vec<u8>) -> Result<()> {
        let mut attr = Vec::new();
        {
            let mut w = Writer::growable(&mut attr);
            self.attribute.encode(&mut w)?;
        }

        let mut w = Writer::growable(out);
        let mut jw = JceWriter::new(&mut w);
        self.request.version.write_field(1, &mut jw)?;
        self.request.packet_type.write_field(2, &mut jw)?;
        self.request.request_id.write_field(3, &mut jw)?;
        self.request.message_type.write_field(4, &mut jw)?;
        ret.write_field(5, &mut jw)?;
        Bytes(attr).write_field(6, &mut jw)?;
        self.request.status.write_field(7, &mut jw)?;
        Ok(())
    }
}
