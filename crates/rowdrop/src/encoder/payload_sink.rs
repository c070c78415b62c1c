// ai
//! 🫁 PayloadSink — text goes in, bytes come out, optionally squished.
//!
//! 🧠 Knowledge graph:
//! - `Plain`: `BufWriter<Vec<u8>>`. `finish` flushes the buffer into the Vec.
//! - `Gzip`: `GzEncoder<Vec<u8>>`. `finish` writes the gzip trailer. Skipping it
//!   produces a file every decompressor on earth will reject.
//! - The encoder calls `write_text` and `finish` and never asks which one it got.

use std::io::{self, BufWriter, Write};

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::trace;

/// 🫁 The sink the encoder writes into. Picked once at construction.
#[derive(Debug)]
pub(crate) enum PayloadSink {
    Plain(BufWriter<Vec<u8>>),
    Gzip(GzEncoder<Vec<u8>>),
}

impl PayloadSink {
    pub(crate) fn open(compress: bool) -> Self {
        if compress {
            Self::Gzip(GzEncoder::new(Vec::new(), Compression::default()))
        } else {
            Self::Plain(BufWriter::new(Vec::new()))
        }
    }

    pub(crate) fn write_text(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        match self {
            Self::Plain(writer) => writer.write_all(text.as_bytes()),
            Self::Gzip(encoder) => encoder.write_all(text.as_bytes()),
        }
    }

    /// 🏁 Flush or finalize, and hand back the accumulated bytes.
    ///
    /// Consumes the sink. There is no writing after the trailer.
    pub(crate) fn finish(self) -> io::Result<Vec<u8>> {
        let the_bytes = match self {
            Self::Plain(writer) => writer.into_inner().map_err(|e| e.into_error())?,
            Self::Gzip(encoder) => encoder.finish()?,
        };
        trace!("🎬 payload sink finalized with {} bytes", the_bytes.len());
        Ok(the_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn the_one_where_plain_text_comes_out_exactly_as_it_went_in() -> io::Result<()> {
        let mut the_sink = PayloadSink::open(false);
        the_sink.write_text("id,name")?;
        the_sink.write_text("")?;
        the_sink.write_text("\n")?;
        assert_eq!(the_sink.finish()?, b"id,name\n");
        Ok(())
    }

    #[test]
    fn the_one_where_gzip_round_trips_through_the_decoder() -> io::Result<()> {
        let mut the_sink = PayloadSink::open(true);
        for _ in 0..1000 {
            the_sink.write_text("squish me\n")?;
        }
        let the_squished = the_sink.finish()?;
        assert_eq!(&the_squished[..2], &[0x1f, 0x8b], "gzip magic bytes, or bust");
        assert!(the_squished.len() < 10_000, "1000 identical lines should compress");

        let mut the_unsquished = String::new();
        GzDecoder::new(&the_squished[..]).read_to_string(&mut the_unsquished)?;
        assert_eq!(the_unsquished, "squish me\n".repeat(1000));
        Ok(())
    }

    #[test]
    fn the_one_where_an_empty_gzip_is_still_a_valid_gzip() -> io::Result<()> {
        let the_squished = PayloadSink::open(true).finish()?;
        let mut the_unsquished = Vec::new();
        GzDecoder::new(&the_squished[..]).read_to_end(&mut the_unsquished)?;
        assert!(the_unsquished.is_empty());
        Ok(())
    }
}
