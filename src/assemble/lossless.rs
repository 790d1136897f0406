use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::Content;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// Rewrite a page's content as one Flate-compressed stream.
///
/// All content streams of the page are parsed as a single operation list and
/// re-serialized, which also drops redundant whitespace. Returns `false` for
/// pages without `/Contents`. A content stream that is missing or cannot be
/// decompressed is an error, so no drawing operations are ever dropped.
pub fn normalize_content(doc: &mut Document, page_id: ObjectId) -> lopdf::Result<bool> {
    if doc.get_dictionary(page_id)?.get(b"Contents").is_err() {
        return Ok(false);
    }

    let raw = page_content(doc, page_id)?;
    let operations = Content::decode(&raw)?;
    let encoded = operations.encode()?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&encoded)?;
    let compressed = encoder.finish()?;

    log::debug!(
        "Content of page {} {}: {} -> {} bytes",
        page_id.0,
        page_id.1,
        raw.len(),
        compressed.len()
    );

    let stream_id = doc.add_object(Stream::new(dictionary! { "Filter" => "FlateDecode" }, compressed));
    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Contents", Object::Reference(stream_id));
    Ok(true)
}

/// Concatenated content of a page, failing on any part that cannot be read
fn page_content(doc: &Document, page_id: ObjectId) -> lopdf::Result<Vec<u8>> {
    let mut content = Vec::new();
    for id in doc.get_page_contents(page_id) {
        let stream = doc.get_object(id).and_then(Object::as_stream)?;
        if stream.dict.has(b"Filter") {
            content.extend(stream.decompressed_content()?);
        } else {
            content.extend_from_slice(&stream.content);
        }
        content.push(b'\n');
    }
    Ok(content)
}

/// Flate-compress every unfiltered stream except images.
///
/// Image samples stay byte-identical; their fate is decided by the image pass.
pub fn compress_plain_streams(doc: &mut Document) {
    for object in doc.objects.values_mut() {
        let Object::Stream(stream) = object else {
            continue;
        };
        let is_image = stream.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Image".as_slice());
        if is_image || !stream.allows_compression {
            continue;
        }
        if let Err(err) = stream.compress() {
            log::warn!("Leaving a stream uncompressed: {}", err);
        }
    }
}
