// ai
//! 🎬 *[the cursor opens. the headers arrive. the commas are counted.]*
//! *[somewhere in the heap, a GzEncoder clears its throat.]*
//! *["Encode me," whispers the result set. "Make me delimited."]*
//!
//! ✂️ The Encoder — rows in, one finished byte buffer out.
//!
//! 🧠 Knowledge graph:
//! - `encode_query`: execute → `encode_cursor` → close the cursor no matter what happened
//! - `encode_cursor`: header once, rows once, forward-only, nothing buffered but the output
//! - `encode_text`: the literal-string path, same sink, same finalize contract
//! - The sink (`PayloadSink`) is plain or gzip, picked once. The encoder never asks which.
//!
//! ```text
//! header:  c1 SEP c2 SEP ... SEP cN TERM
//! row:     v1 SEP v2 SEP ... SEP vN TERM      (NULL → nothing, the SEP still shows up)
//! ```
//!
//! ⚠️ No quoting, no escaping. A comma inside a value is a comma in the output.
//! Pick a separator your data does not contain. This is the format, not a bug.
//!
//! 🦆 (the duck counted the separators. there were C−1 per line. the duck is satisfied.)

mod payload_sink;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::backends::{Database, ResultCursor};
use crate::common::{DelimitedFormat, EncodedPayload, Row};
use crate::error::{ExportError, ExportResult};

use payload_sink::PayloadSink;

/// 🗄️ Run `query`, encode every row, and close the cursor on the way out. Always.
///
/// Errors from encoding win over errors from closing. A close failure after a
/// clean encode still fails the call, because a cursor that can't close cleanly
/// is not a cursor we trust with our payload.
pub async fn encode_query<D>(
    database: &D,
    query: &str,
    format: &DelimitedFormat,
    compress: bool,
) -> ExportResult<EncodedPayload>
where
    D: Database + ?Sized,
{
    let mut the_cursor = database.execute(query).await?;
    let the_encoding = encode_cursor(the_cursor.as_mut(), format, compress).await;
    let the_closing = the_cursor.close().await;

    match (the_encoding, the_closing) {
        (Ok(payload), Ok(())) => Ok(payload),
        (Ok(_), Err(close_error)) => Err(ExportError::query(
            "closing the result cursor failed",
            close_error,
        )),
        (Err(encode_error), Ok(())) => Err(encode_error),
        (Err(encode_error), Err(close_error)) => {
            // -- 🧅 two failures, one return value. the first one is the story, the second is a footnote.
            warn!("⚠️ cursor close also failed after an encoding error: {close_error:#}");
            Err(encode_error)
        }
    }
}

/// ✂️ Drain `cursor` into delimited text. Does not close the cursor; the caller owns that.
pub async fn encode_cursor(
    cursor: &mut dyn ResultCursor,
    format: &DelimitedFormat,
    compress: bool,
) -> ExportResult<EncodedPayload> {
    let the_columns = cursor
        .column_names()
        .await
        .map_err(|e| ExportError::query("reading result column names", e))?;
    if the_columns.is_empty() {
        return Err(ExportError::EmptySchema);
    }
    let the_arity = the_columns.len();

    let mut the_sink = PayloadSink::open(compress);
    write_text(&mut the_sink, &the_columns.join(&format.separator), 0)?;
    write_text(&mut the_sink, &format.line_terminator, 0)?;

    let mut the_row_count = 0u64;
    loop {
        let the_row = cursor.next_row().await.map_err(|e| {
            ExportError::encoding(
                format!("scanning row {}", the_row_count + 1),
                the_row_count,
                Some(e.into()),
            )
        })?;
        let Some(row) = the_row else {
            break;
        };
        the_row_count += 1;
        if row.len() != the_arity {
            return Err(ExportError::encoding(
                format!(
                    "row {} has {} cells but the header has {} columns",
                    the_row_count,
                    row.len(),
                    the_arity
                ),
                the_row_count,
                None,
            ));
        }
        write_row(&mut the_sink, &row, format, the_row_count)?;
    }

    let the_bytes = the_sink.finish().map_err(|e| {
        ExportError::encoding("finalizing the payload", the_row_count, Some(e.into()))
    })?;
    debug!(
        "✂️ encoded {} rows into {} bytes (compressed: {})",
        the_row_count,
        the_bytes.len(),
        compress
    );
    Ok(EncodedPayload::new(
        Bytes::from(the_bytes),
        the_row_count,
        compress,
    ))
}

/// 📜 The literal-string path: no cursor, no header, no rows. Same sink, same finalize.
pub fn encode_text(content: &str, compress: bool) -> ExportResult<EncodedPayload> {
    let mut the_sink = PayloadSink::open(compress);
    write_text(&mut the_sink, content, 0)?;
    let the_bytes = the_sink
        .finish()
        .map_err(|e| ExportError::encoding("finalizing the payload", 0, Some(e.into())))?;
    Ok(EncodedPayload::new(Bytes::from(the_bytes), 0, compress))
}

/// 🧵 One row: SEP after every cell but the last, whether or not the cell had text.
fn write_row(
    sink: &mut PayloadSink,
    row: &Row,
    format: &DelimitedFormat,
    rows_read: u64,
) -> ExportResult<()> {
    let Some((the_last, the_leading)) = row.split_last() else {
        // -- arity was checked against a non-empty header, so this is unreachable in practice
        return write_text(sink, &format.line_terminator, rows_read);
    };
    for cell in the_leading {
        if let Some(value) = cell {
            write_text(sink, value, rows_read)?;
        }
        write_text(sink, &format.separator, rows_read)?;
    }
    if let Some(value) = the_last {
        write_text(sink, value, rows_read)?;
    }
    write_text(sink, &format.line_terminator, rows_read)
}

fn write_text(sink: &mut PayloadSink, text: &str, rows_read: u64) -> ExportResult<()> {
    sink.write_text(text)
        .map_err(|e| ExportError::encoding("writing to the payload sink", rows_read, Some(e.into())))
}
