use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use pdf_shrink::error::FallbackError;
use pdf_shrink::extract::{page_images, RasterEntry};
use pdf_shrink::model::PixelBuffer;
use pdf_shrink::{compress_pdf, compress_pdf_with, CompressError, FallbackRenderer, PageSelection, Policy};

/// Builds small PDFs in memory
struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfBuilder {
    fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    fn add_image(&mut self, stream: Stream) -> ObjectId {
        self.doc.add_object(stream)
    }

    /// A page drawing each named image, with `label` in its content
    fn add_page(&mut self, label: &str, images: &[(&str, ObjectId)]) -> ObjectId {
        let mut content = format!("BT /F1 12 Tf 72 720 Td ({label}) Tj ET\n");
        let mut xobjects = lopdf::Dictionary::new();
        for (name, id) in images {
            content.push_str(&format!("q 200 0 0 200 72 300 cm /{name} Do Q\n"));
            xobjects.set(name.as_bytes().to_vec(), Object::Reference(*id));
        }
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        self.add_page_with(content_id, xobjects)
    }

    fn add_page_with(&mut self, content_id: ObjectId, xobjects: lopdf::Dictionary) -> ObjectId {
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        self.kids.push(page_id.into());
        page_id
    }

    fn save(mut self, path: &Path) {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog = self.doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => self.pages_id });
        self.doc.trailer.set("Root", catalog);
        self.doc.save(path).expect("Failed to save fixture PDF");
    }
}

fn image_dict(width: u32, height: u32, color_space: Object, bpc: i64) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => color_space,
        "BitsPerComponent" => bpc,
    }
}

/// Unfiltered RGB gradient; compresses very well as JPEG
fn raw_rgb_image(width: u32, height: u32, seed: u8) -> Stream {
    let mut samples = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            samples.extend_from_slice(&[(x * 2) as u8, (y * 2) as u8, seed]);
        }
    }
    Stream::new(image_dict(width, height, "DeviceRGB".into(), 8), samples)
}

/// 8-bit indexed gray ramp; the primary decoder does not handle it
fn indexed_image(width: u32, height: u32) -> Stream {
    let palette: Vec<u8> = (0..=255u8).flat_map(|v| [v, v, v]).collect();
    let color_space = Object::Array(vec![
        Object::Name(b"Indexed".to_vec()),
        Object::Name(b"DeviceRGB".to_vec()),
        Object::Integer(255),
        Object::String(palette, lopdf::StringFormat::Hexadecimal),
    ]);
    let mut samples = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            samples.push(((x + y) / 2) as u8);
        }
    }
    Stream::new(image_dict(width, height, color_space, 8), samples)
}

fn jpeg_bytes(width: u16, height: u16, quality: u8) -> Vec<u8> {
    let pixels: Vec<u8> = (0..u32::from(width) * u32::from(height))
        .flat_map(|i| [(i % 251) as u8, (i * 7 % 253) as u8, (i * 13 % 241) as u8])
        .collect();
    let mut bytes = Vec::new();
    jpeg_encoder::Encoder::new(&mut bytes, quality)
        .encode(&pixels, width, height, jpeg_encoder::ColorType::Rgb)
        .expect("Failed to encode fixture JPEG");
    bytes
}

/// Form XObject drawing each of its images
fn form_xobject(images: &[(&str, ObjectId)]) -> Stream {
    let mut content = String::new();
    let mut xobjects = lopdf::Dictionary::new();
    for (name, id) in images {
        content.push_str(&format!("q 100 0 0 100 0 0 cm /{name} Do Q\n"));
        xobjects.set(name.as_bytes().to_vec(), Object::Reference(*id));
    }
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(100), Object::Integer(100)],
            "Resources" => dictionary! { "XObject" => xobjects },
        },
        content.into_bytes(),
    )
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn paths(dir: &tempfile::TempDir) -> (PathBuf, PathBuf) {
    (dir.path().join("input.pdf"), dir.path().join("input_compressed.pdf"))
}

fn image_stream<'a>(doc: &'a Document, page_id: ObjectId, name: &str) -> (ObjectId, &'a Stream) {
    let image = page_images(doc, page_id, 1)
        .expect("Failed to enumerate images")
        .into_iter()
        .find(|image| image.name_str() == name)
        .expect("Image missing from page");
    let stream = doc
        .get_object(image.id)
        .and_then(Object::as_stream)
        .expect("Image is not a stream");
    (image.id, stream)
}

fn name_of<'a>(stream: &'a Stream, key: &[u8]) -> Option<&'a [u8]> {
    stream.dict.get(key).and_then(Object::as_name).ok()
}

#[test]
fn test_selection_keeps_requested_pages_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let mut builder = PdfBuilder::new();
    for n in 1..=10 {
        let image = builder.add_image(raw_rgb_image(16, 16, n as u8));
        builder.add_page(&format!("page {n}"), &[("Im0", image)]);
    }
    builder.save(&input);

    let policy = Policy::default().with_selection(pdf_shrink::parse_page_selection(Some("2,4-6")).unwrap());
    let report = compress_pdf(&input, &output, &policy).expect("Compression failed");

    assert!(report.output_written);
    assert_eq!(report.pages_retained, 4);

    let doc = Document::load(&output).expect("Output is not a valid PDF");
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 4);

    let labels: Vec<String> = pages
        .values()
        .map(|&id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned())
        .collect();
    for (content, expected) in labels.iter().zip(["page 2", "page 4", "page 5", "page 6"]) {
        assert!(content.contains(expected), "{content:?} should mention {expected}");
    }
}

#[test]
fn test_lossless_keeps_images_and_compresses_content() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let mut builder = PdfBuilder::new();
    let image = builder.add_image(raw_rgb_image(32, 32, 7));
    let mut pages = Vec::new();
    for n in 1..=3 {
        let mut content = String::new();
        for line in 0..200 {
            content.push_str(&format!("BT /F1 10 Tf 72 {} Td (line {line} of page {n}) Tj ET\n", 700 - line));
        }
        let content_id = builder.doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        pages.push(builder.add_page_with(content_id, dictionary! { "Im0" => image }));
    }
    let original_samples = builder.doc.get_object(image).unwrap().as_stream().unwrap().content.clone();
    builder.save(&input);

    let policy = Policy::default().with_lossless(true);
    let report = compress_pdf(&input, &output, &policy).expect("Compression failed");
    assert!(report.output_written);
    assert_eq!(report.images.seen, 0);

    let doc = Document::load(&output).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
    for &page_id in doc.get_pages().values() {
        let (_, stream) = image_stream(&doc, page_id, "Im0");
        assert_eq!(stream.content, original_samples);
        assert!(stream.dict.get(b"Filter").is_err());

        let page = doc.get_dictionary(page_id).unwrap();
        let contents = page.get(b"Contents").unwrap().as_reference().expect("single content stream");
        let contents = doc.get_object(contents).unwrap().as_stream().unwrap();
        assert_eq!(name_of(contents, b"Filter"), Some(b"FlateDecode".as_slice()));
    }
}

#[test]
fn test_remove_images_uses_one_white_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let mut builder = PdfBuilder::new();
    let first = builder.add_image(raw_rgb_image(48, 48, 1));
    let second = builder.add_image(raw_rgb_image(48, 48, 2));
    builder.add_page("one", &[("Im0", first), ("Im1", second)]);
    builder.add_page("two", &[("Im0", second)]);
    builder.save(&input);

    let policy = Policy::default().with_remove_images(true);
    let report = compress_pdf(&input, &output, &policy).expect("Compression failed");
    assert_eq!(report.images.removed, 3);

    let doc = Document::load(&output).unwrap();
    let mut placeholders = Vec::new();
    for &page_id in doc.get_pages().values() {
        for image in page_images(&doc, page_id, 1).unwrap() {
            let stream = doc.get_object(image.id).unwrap().as_stream().unwrap();
            assert_eq!((image.width, image.height), (1, 1));
            assert_eq!(stream.content, vec![255, 255, 255]);
            assert_eq!(name_of(stream, b"ColorSpace"), Some(b"DeviceRGB".as_slice()));
            placeholders.push(image.id);
        }
    }
    assert_eq!(placeholders.len(), 3);
    placeholders.dedup();
    assert_eq!(placeholders.len(), 1);
    assert!(doc.get_object(first).is_err());
    assert!(doc.get_object(second).is_err());
}

#[test]
fn test_alpha_image_becomes_white_backed_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let mut builder = PdfBuilder::new();
    let (width, height) = (64u32, 64u32);
    // left half transparent, right half opaque
    let alpha: Vec<u8> = (0..height)
        .flat_map(|_| (0..width).map(|x| if x < width / 2 { 0 } else { 255 }))
        .collect();
    let smask = builder.add_image(Stream::new(image_dict(width, height, "DeviceGray".into(), 8), alpha));
    let mut image = raw_rgb_image(width, height, 0);
    for sample in image.content.iter_mut() {
        *sample = 0;
    }
    image.dict.set("SMask", smask);
    let image = builder.add_image(image);
    builder.add_page("alpha", &[("Im0", image)]);
    builder.save(&input);

    let report = compress_pdf(&input, &output, &Policy::default()).expect("Compression failed");
    assert_eq!(report.images.replaced, 1);

    let doc = Document::load(&output).unwrap();
    let page_id = doc.get_pages()[&1];
    let (_, stream) = image_stream(&doc, page_id, "Im0");
    assert_eq!(name_of(stream, b"Filter"), Some(b"DCTDecode".as_slice()));
    assert_eq!(name_of(stream, b"ColorSpace"), Some(b"DeviceRGB".as_slice()));
    assert!(stream.dict.get(b"SMask").is_err());

    let decoded = image::load_from_memory(&stream.content).unwrap().to_rgb8();
    assert!(decoded.get_pixel(4, 32).0.iter().all(|&c| c > 240), "transparent side should be white");
    assert!(decoded.get_pixel(60, 32).0.iter().all(|&c| c < 15), "opaque side should stay black");
}

#[test]
fn test_primary_unsupported_image_goes_through_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let mut builder = PdfBuilder::new();
    let image = builder.add_image(indexed_image(128, 128));
    builder.add_page("indexed", &[("Im0", image)]);
    builder.save(&input);

    let report = compress_pdf(&input, &output, &Policy::default()).expect("Compression failed");
    assert_eq!(report.images.via_fallback, 1);
    assert_eq!(report.images.replaced, 1);

    let doc = Document::load(&output).unwrap();
    let (_, stream) = image_stream(&doc, doc.get_pages()[&1], "Im0");
    assert_eq!(name_of(stream, b"Filter"), Some(b"DCTDecode".as_slice()));
    assert!(stream.content.len() < 128 * 128);
}

/// A renderer whose inventories are always empty
struct EmptyInventory;

impl FallbackRenderer for EmptyInventory {
    fn inventory(&mut self, _page_index: usize) -> Result<&[RasterEntry], FallbackError> {
        Ok(&[])
    }

    fn render(&mut self, page_index: usize, id: ObjectId) -> Result<PixelBuffer, FallbackError> {
        Err(FallbackError::NotFound { page: page_index, id })
    }
}

#[test]
fn test_image_missing_from_inventory_is_left_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let mut builder = PdfBuilder::new();
    let indexed = builder.add_image(indexed_image(64, 64));
    let rgb = builder.add_image(raw_rgb_image(64, 64, 3));
    builder.add_page("mixed", &[("Im0", indexed), ("Im1", rgb)]);
    let original = builder.doc.get_object(indexed).unwrap().as_stream().unwrap().content.clone();
    builder.save(&input);

    let report = compress_pdf_with(&input, &output, &Policy::default(), &mut EmptyInventory)
        .expect("Compression failed");
    assert_eq!(report.images.failed, 1);
    assert_eq!(report.images.replaced, 1);
    assert!(report.output_written);

    let doc = Document::load(&output).unwrap();
    let page_id = doc.get_pages()[&1];
    let (id, stream) = image_stream(&doc, page_id, "Im0");
    assert_eq!(id, indexed);
    assert_eq!(stream.content, original);
    let (_, replaced) = image_stream(&doc, page_id, "Im1");
    assert_eq!(name_of(replaced, b"Filter"), Some(b"DCTDecode".as_slice()));
}

#[test]
fn test_shared_image_is_encoded_once() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let mut builder = PdfBuilder::new();
    let shared = builder.add_image(raw_rgb_image(64, 64, 9));
    builder.add_page("first", &[("Im0", shared)]);
    builder.add_page("second", &[("Pic", shared)]);
    builder.save(&input);

    let report = compress_pdf(&input, &output, &Policy::default()).expect("Compression failed");
    assert_eq!(report.images.seen, 2);
    assert_eq!(report.images.replaced, 2);

    let doc = Document::load(&output).unwrap();
    let pages = doc.get_pages();
    let (first, _) = image_stream(&doc, pages[&1], "Im0");
    let (second, stream) = image_stream(&doc, pages[&2], "Pic");
    assert_eq!(first, second);
    assert_ne!(first, shared);
    assert_eq!(name_of(stream, b"Filter"), Some(b"DCTDecode".as_slice()));
    assert!(doc.get_object(shared).is_err());
}

#[test]
fn test_image_gate_keeps_smaller_original() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let mut builder = PdfBuilder::new();
    let jpeg = jpeg_bytes(32, 32, 5);
    let mut dict = image_dict(32, 32, "DeviceRGB".into(), 8);
    dict.set("Filter", "DCTDecode");
    let small = builder.add_image(Stream::new(dict, jpeg.clone()));
    let big = builder.add_image(raw_rgb_image(64, 64, 4));
    builder.add_page("gate", &[("Im0", small), ("Im1", big)]);
    builder.save(&input);

    let policy = Policy::default().with_quality(100);
    let report = compress_pdf(&input, &output, &policy).expect("Compression failed");
    assert_eq!(report.images.declined, 1);
    assert_eq!(report.images.replaced, 1);

    let doc = Document::load(&output).unwrap();
    let (id, stream) = image_stream(&doc, doc.get_pages()[&1], "Im0");
    assert_eq!(id, small);
    assert_eq!(stream.content, jpeg);
}

#[test]
fn test_convert_png_off_passes_lossless_images_through() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let mut builder = PdfBuilder::new();
    let mut dict = image_dict(64, 64, "DeviceRGB".into(), 8);
    dict.set("Filter", "FlateDecode");
    let flate = builder.add_image(Stream::new(dict, zlib(&raw_rgb_image(64, 64, 5).content)));
    builder.add_page("png", &[("Im0", flate)]);
    builder.save(&input);

    let policy = Policy::default().with_convert_png(false);
    let report = compress_pdf(&input, &output, &policy).expect("Compression failed");
    assert_eq!(report.images.passed_through, 1);
    assert_eq!(report.images.replaced, 0);
}

#[test]
fn test_output_never_larger_than_input() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    // Pages share one resource dictionary by reference. Removing the tiny
    // image gives every page its own copy of it, which outweighs the saving.
    let mut builder = PdfBuilder::new();
    let image = builder.add_image(raw_rgb_image(1, 1, 0));
    let mut states = lopdf::Dictionary::new();
    for n in 0..40 {
        let state = builder.doc.add_object(dictionary! { "Type" => "ExtGState", "CA" => 1 });
        states.set(format!("GS{n}").into_bytes(), Object::Reference(state));
    }
    let shared = builder.doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im0" => image },
        "ExtGState" => states,
    });
    for _ in 0..20 {
        let content_id = builder.doc.add_object(Stream::new(
            dictionary! { "Filter" => "FlateDecode" },
            zlib(b"q /GS0 gs 1 0 0 1 0 0 cm /Im0 Do Q"),
        ));
        let page_id = builder.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => builder.pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
            "Contents" => content_id,
            "Resources" => shared,
        });
        builder.kids.push(page_id.into());
    }
    builder.save(&input);
    let input_size = fs::metadata(&input).unwrap().len();

    let policy = Policy::default().with_remove_images(true);
    let report = compress_pdf(&input, &output, &policy).expect("Compression failed");

    assert_eq!(report.images.removed, 20);
    assert!(report.assembled_size > input_size);
    assert!(!report.output_written);
    assert!(!output.exists());
    assert_eq!(report.result_path, input);
    assert_eq!(report.result_size, input_size);
    assert_eq!(report.size_reduction_percent(), 0.0);
}

#[test]
fn test_images_inside_forms_are_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let mut builder = PdfBuilder::new();
    let outer = builder.add_image(raw_rgb_image(64, 64, 1));
    let nested = builder.add_image(raw_rgb_image(128, 128, 2));
    let form = builder.doc.add_object(form_xobject(&[("Im9", nested)]));
    builder.add_page("first", &[("Im0", outer), ("Fm0", form)]);
    builder.add_page("second", &[("Fm0", form)]);
    builder.save(&input);

    let report = compress_pdf(&input, &output, &Policy::default()).expect("Compression failed");
    assert_eq!(report.images.seen, 3);
    assert_eq!(report.images.replaced, 3);

    let doc = Document::load(&output).unwrap();
    let pages = doc.get_pages();
    let (first, stream) = image_stream(&doc, pages[&1], "Fm0/Im9");
    assert_eq!(name_of(stream, b"Filter"), Some(b"DCTDecode".as_slice()));
    let (second, _) = image_stream(&doc, pages[&2], "Fm0/Im9");
    assert_eq!(first, second);
    assert!(doc.get_object(nested).is_err());

    let (_, stream) = image_stream(&doc, pages[&1], "Im0");
    assert_eq!(name_of(stream, b"Filter"), Some(b"DCTDecode".as_slice()));
}

#[test]
fn test_remove_images_reaches_into_forms() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let mut builder = PdfBuilder::new();
    let outer = builder.add_image(raw_rgb_image(64, 64, 1));
    let nested = builder.add_image(raw_rgb_image(128, 128, 2));
    let form = builder.doc.add_object(form_xobject(&[("Im9", nested)]));
    builder.add_page("forms", &[("Im0", outer), ("Fm0", form)]);
    builder.save(&input);

    let policy = Policy::default().with_remove_images(true);
    let report = compress_pdf(&input, &output, &policy).expect("Compression failed");
    assert_eq!(report.images.removed, 2);
    assert!(report.output_written);

    let doc = Document::load(&output).unwrap();
    let page_id = doc.get_pages()[&1];
    let (outer_id, _) = image_stream(&doc, page_id, "Im0");
    let (nested_id, stream) = image_stream(&doc, page_id, "Fm0/Im9");
    assert_eq!(outer_id, nested_id);
    assert_eq!(stream.content, vec![255, 255, 255]);
    assert!(doc.get_object(nested).is_err());
}

#[test]
fn test_cmyk_jpeg_is_recompressed_without_convert_png() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let (width, height) = (128u16, 128u16);
    let pixels: Vec<u8> = (0..u32::from(width) * u32::from(height))
        .flat_map(|i| [(i % 251) as u8, (i * 7 % 253) as u8, (i * 13 % 241) as u8, (i * 3 % 239) as u8])
        .collect();
    let mut jpeg = Vec::new();
    jpeg_encoder::Encoder::new(&mut jpeg, 100)
        .encode(&pixels, width, height, jpeg_encoder::ColorType::Cmyk)
        .expect("Failed to encode fixture JPEG");

    let mut builder = PdfBuilder::new();
    let mut dict = image_dict(u32::from(width), u32::from(height), "DeviceCMYK".into(), 8);
    dict.set("Filter", "DCTDecode");
    let image = builder.add_image(Stream::new(dict, jpeg));
    builder.add_page("cmyk", &[("Im0", image)]);
    builder.save(&input);

    let policy = Policy::default().with_convert_png(false).with_quality(30);
    let report = compress_pdf(&input, &output, &policy).expect("Compression failed");
    assert_eq!(report.images.via_fallback, 1);
    assert_eq!(report.images.passed_through, 0);
    assert_eq!(report.images.replaced, 1);

    let doc = Document::load(&output).unwrap();
    let (_, stream) = image_stream(&doc, doc.get_pages()[&1], "Im0");
    assert_eq!(name_of(stream, b"Filter"), Some(b"DCTDecode".as_slice()));
    assert_eq!(name_of(stream, b"ColorSpace"), Some(b"DeviceRGB".as_slice()));
}

#[test]
fn test_unreadable_content_stops_lossless_run() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let mut builder = PdfBuilder::new();
    builder.add_page_with((99, 0), lopdf::Dictionary::new());
    builder.save(&input);

    let policy = Policy::default().with_lossless(true);
    assert!(matches!(
        compress_pdf(&input, &output, &policy),
        Err(CompressError::LosslessNormalization { page: 1, .. })
    ));
    assert!(!output.exists());
}

#[test]
fn test_page_with_broken_resources_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let mut builder = PdfBuilder::new();
    let content_id = builder.doc.add_object(Stream::new(dictionary! {}, b"q /Im0 Do Q".to_vec()));
    builder.add_page_with(content_id, dictionary! { "Im0" => Object::Integer(5) });
    let image = builder.add_image(raw_rgb_image(64, 64, 8));
    builder.add_page("fine", &[("Im0", image)]);
    builder.save(&input);

    let report = compress_pdf(&input, &output, &Policy::default()).expect("Compression failed");
    assert_eq!(report.images.pages_skipped, 1);
    assert_eq!(report.images.seen, 1);
    assert_eq!(report.images.replaced, 1);
    assert!(report.output_written);

    let doc = Document::load(&output).unwrap();
    let broken = doc.get_dictionary(doc.get_pages()[&1]).unwrap();
    let xobjects = broken.get(b"Resources").unwrap().as_dict().unwrap().get(b"XObject").unwrap();
    assert_eq!(xobjects.as_dict().unwrap().get(b"Im0").unwrap(), &Object::Integer(5));
}

#[test]
fn test_missing_input_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);
    assert!(matches!(
        compress_pdf(&input, &output, &Policy::default()),
        Err(CompressError::InputNotFound(_))
    ));
}

#[test]
fn test_selection_outside_document_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let mut builder = PdfBuilder::new();
    builder.add_page("only", &[]);
    builder.save(&input);

    let policy = Policy::default().with_selection(PageSelection::Only([5].into_iter().collect()));
    assert!(matches!(
        compress_pdf(&input, &output, &policy),
        Err(CompressError::EmptySelection { page_count: 1 })
    ));
    assert!(!output.exists());
}

#[test]
fn test_cli_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let mut builder = PdfBuilder::new();
    let image = builder.add_image(raw_rgb_image(64, 64, 6));
    builder.add_page("cli", &[("Im0", image)]);
    builder.save(&input);

    let result = Command::new(env!("CARGO_BIN_EXE_pdf-shrink"))
        .args(["-i", input.to_str().unwrap(), "-q", "50"])
        .output()
        .expect("Failed to run pdf-shrink");
    assert!(result.status.success());

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("Performs a lossy compression..."));
    assert!(stdout.contains(&format!("Done. The result is saved at {}", output.display())));
    assert!(stdout.contains("which gave us a size reduction of"));
    assert!(output.exists());
}

#[test]
fn test_cli_rejects_bad_selection() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = paths(&dir);

    let mut builder = PdfBuilder::new();
    builder.add_page("cli", &[]);
    builder.save(&input);

    let status = Command::new(env!("CARGO_BIN_EXE_pdf-shrink"))
        .args(["-i", input.to_str().unwrap(), "--selectPages", "5-2"])
        .status()
        .expect("Failed to run pdf-shrink");
    assert_eq!(status.code(), Some(1));
}
