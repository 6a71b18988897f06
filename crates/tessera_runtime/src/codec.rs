//! Binary field codec shared by envelopes, transaction bodies and records.
//!
//! - `u64`: fixed 8 bytes, big-endian
//! - varint: unsigned LEB128
//! - bytes/strings: varint length, then the raw bytes
//! - hash: length-prefixed, length must be 32
//! - big integer: length-prefixed big-endian magnitude, zero is empty
//! - optional: one presence byte (0 or 1), then the value
//!
//! Every read checks the remaining input first and fails with an encoding
//! error instead of reading past the end.

use crate::error::{ExecError, Result};
use bytes::{Buf, BufMut, BytesMut};
use num_bigint::BigUint;
use num_traits::Zero;

#[derive(Debug, Default)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u64(&mut self, v: u64) {
        self.buf.put_u64(v);
    }

    pub fn uvarint(&mut self, v: u64) {
        let mut tmp = Vec::with_capacity(10);
        // Writing into a Vec cannot fail.
        let _ = leb128::write::unsigned(&mut tmp, v);
        self.buf.put_slice(&tmp);
    }

    pub fn bool(&mut self, v: bool) {
        self.buf.put_u8(u8::from(v));
    }

    pub fn bytes(&mut self, v: &[u8]) {
        self.uvarint(v.len() as u64);
        self.buf.put_slice(v);
    }

    pub fn string(&mut self, v: &str) {
        self.bytes(v.as_bytes());
    }

    pub fn hash(&mut self, v: &[u8; 32]) {
        self.bytes(v);
    }

    pub fn bigint(&mut self, v: &BigUint) {
        if v.is_zero() {
            self.uvarint(0);
        } else {
            self.bytes(&v.to_bytes_be());
        }
    }

    pub fn opt_hash(&mut self, v: Option<&[u8; 32]>) {
        self.bool(v.is_some());
        if let Some(h) = v {
            self.hash(h);
        }
    }

    /// Raw bytes with no length prefix.
    pub fn raw(&mut self, v: &[u8]) {
        self.buf.put_slice(v);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Decoder<'a> {
    data: &'a [u8],
}

fn truncated(what: &str) -> ExecError {
    ExecError::Encoding(format!("truncated {}", what))
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Unconsumed input.
    pub fn rest(&self) -> &'a [u8] {
        self.data
    }

    /// Fail if anything is left over.
    pub fn finish(self) -> Result<()> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(ExecError::Encoding(format!(
                "{} trailing bytes",
                self.data.len()
            )))
        }
    }

    pub fn u64(&mut self) -> Result<u64> {
        if self.data.remaining() < 8 {
            return Err(truncated("u64"));
        }
        Ok(self.data.get_u64())
    }

    /// LEB128 in its shortest form. A padded varint (trailing 0x00 group)
    /// decodes to the same number as the short one and is refused.
    pub fn uvarint(&mut self) -> Result<u64> {
        let start = self.data;
        let v = leb128::read::unsigned(&mut self.data).map_err(|e| match e {
            leb128::read::Error::IoError(_) => truncated("varint"),
            leb128::read::Error::Overflow => ExecError::Encoding("varint overflows u64".into()),
        })?;
        let used = start.len() - self.data.len();
        if used > 1 && start[used - 1] == 0 {
            return Err(ExecError::Encoding("non-minimal varint".into()));
        }
        Ok(v)
    }

    pub fn bool(&mut self) -> Result<bool> {
        if self.data.remaining() < 1 {
            return Err(truncated("flag"));
        }
        match self.data.get_u8() {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(ExecError::Encoding(format!("invalid flag byte {}", b))),
        }
    }

    pub fn bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.uvarint()?;
        let len = usize::try_from(len)
            .ok()
            .filter(|&n| n <= self.data.len())
            .ok_or_else(|| {
                ExecError::Encoding(format!(
                    "length prefix {} overruns {} remaining bytes",
                    len,
                    self.data.len()
                ))
            })?;
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }

    pub fn string(&mut self) -> Result<String> {
        let b = self.bytes()?;
        String::from_utf8(b.to_vec()).map_err(|_| ExecError::Encoding("invalid utf-8".into()))
    }

    pub fn hash(&mut self) -> Result<[u8; 32]> {
        let b = self.bytes()?;
        b.try_into()
            .map_err(|_| ExecError::Encoding(format!("hash must be 32 bytes, got {}", b.len())))
    }

    /// Big-endian magnitude without leading zero bytes; zero is empty.
    pub fn bigint(&mut self) -> Result<BigUint> {
        let b = self.bytes()?;
        if b.first() == Some(&0) {
            return Err(ExecError::Encoding("integer has a leading zero byte".into()));
        }
        Ok(BigUint::from_bytes_be(b))
    }

    pub fn opt_hash(&mut self) -> Result<Option<[u8; 32]>> {
        if self.bool()? {
            Ok(Some(self.hash()?))
        } else {
            Ok(None)
        }
    }
}
