use std::path::Path;

use lopdf::{Dictionary, Document, Object};

use crate::error::IngestionError;
use crate::persist::atomic_write;
use crate::types::ImageRecord;

/// Extract every embedded raster image from a PDF
///
/// Each image is written to `images_dir/page_<p>_img_<n>.<ext>` (1-indexed
/// page and per-page ordinal) and recorded in `images_dir/images.json`. The
/// directory is rebuilt wholesale: stale files from a prior document are
/// removed first. Runs independently of text extraction.
///
/// Only self-contained raster streams are written: DCTDecode as `.jpg`,
/// JPXDecode as `.jp2`. Images in other encodings are raw sample data that
/// would need transcoding and are skipped with a debug log.
pub fn extract_images(
    pdf_path: &Path,
    images_dir: &Path,
) -> Result<Vec<ImageRecord>, IngestionError> {
    let doc = Document::load(pdf_path).map_err(|e| IngestionError::PdfUnreadable {
        path: pdf_path.display().to_string(),
        reason: e.to_string(),
    })?;

    reset_dir(images_dir)?;

    let mut records = Vec::new();
    for (page_no, page_id) in doc.get_pages() {
        let mut ordinal = 0usize;
        for (name, stream_dict, content) in page_images(&doc, page_id) {
            let Some(ext) = image_extension(stream_dict) else {
                tracing::debug!(
                    page = page_no,
                    xobject = %String::from_utf8_lossy(name),
                    "skipping image with unsupported encoding"
                );
                continue;
            };

            ordinal += 1;
            let file_path = images_dir.join(format!("page_{page_no}_img_{ordinal}.{ext}"));
            std::fs::write(&file_path, content).map_err(|e| IngestionError::WriteFailed {
                what: "image",
                path: file_path.display().to_string(),
                reason: e.to_string(),
            })?;

            records.push(ImageRecord {
                page: page_no,
                file_path: file_path.to_string_lossy().into_owned(),
            });
        }
    }

    let index_path = images_dir.join("images.json");
    let json = serde_json::to_vec_pretty(&records).map_err(|e| IngestionError::WriteFailed {
        what: "images index",
        path: index_path.display().to_string(),
        reason: e.to_string(),
    })?;
    atomic_write(&index_path, &json).map_err(|e| IngestionError::WriteFailed {
        what: "images index",
        path: index_path.display().to_string(),
        reason: e.to_string(),
    })?;

    tracing::info!(images = records.len(), "extracted embedded images");
    Ok(records)
}

/// Remove any prior extraction output and recreate the directory
fn reset_dir(dir: &Path) -> Result<(), IngestionError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(IngestionError::WriteFailed {
                what: "images directory",
                path: dir.display().to_string(),
                reason: e.to_string(),
            });
        }
    }
    std::fs::create_dir_all(dir).map_err(|e| IngestionError::WriteFailed {
        what: "images directory",
        path: dir.display().to_string(),
        reason: e.to_string(),
    })
}

/// Image XObject streams referenced by a page's resources, in resource order
fn page_images<'a>(
    doc: &'a Document,
    page_id: lopdf::ObjectId,
) -> Vec<(&'a [u8], &'a Dictionary, &'a [u8])> {
    let mut images = Vec::new();

    let Ok(page) = doc.get_dictionary(page_id) else {
        return images;
    };
    let Some(resources) = page.get(b"Resources").ok().and_then(|o| as_dict(doc, o)) else {
        return images;
    };
    let Some(xobjects) = resources.get(b"XObject").ok().and_then(|o| as_dict(doc, o)) else {
        return images;
    };

    for (name, value) in xobjects.iter() {
        let Object::Stream(stream) = resolved(doc, value) else {
            continue;
        };
        let is_image = matches!(
            stream.dict.get(b"Subtype"),
            Ok(Object::Name(subtype)) if subtype == b"Image"
        );
        if is_image {
            images.push((name.as_slice(), &stream.dict, stream.content.as_slice()));
        }
    }

    images
}

/// Follow one level of indirection if the object is a reference
fn resolved<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn as_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolved(doc, obj) {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// File extension for a self-contained image stream, by its PDF filter
fn image_extension(dict: &Dictionary) -> Option<&'static str> {
    let filters: Vec<&[u8]> = match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.as_slice()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Object::Name(name) => Some(name.as_slice()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    if filters.contains(&b"DCTDecode".as_slice()) {
        Some("jpg")
    } else if filters.contains(&b"JPXDecode".as_slice()) {
        Some("jp2")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};
    use tempfile::TempDir;

    /// Build a two-page PDF: page 1 carries a JPEG image plus a Flate-coded
    /// one (which must be skipped), page 2 carries a second JPEG.
    fn fixture_pdf(path: &Path) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let jpeg_a = image_stream("DCTDecode", b"jpeg-bytes-a".to_vec());
        let flate = image_stream("FlateDecode", b"raw-samples".to_vec());
        let jpeg_b = image_stream("DCTDecode", b"jpeg-bytes-b".to_vec());

        let jpeg_a_id = doc.add_object(jpeg_a);
        let flate_id = doc.add_object(flate);
        let jpeg_b_id = doc.add_object(jpeg_b);

        let page_1 = make_page(&mut doc, pages_id, vec![("Im1", jpeg_a_id), ("Im2", flate_id)]);
        let page_2 = make_page(&mut doc, pages_id, vec![("Im1", jpeg_b_id)]);

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_1.into(), page_2.into()],
            "Count" => 2,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    fn image_stream(filter: &str, content: Vec<u8>) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => filter,
            },
            content,
        )
    }

    fn make_page(
        doc: &mut Document,
        pages_id: lopdf::ObjectId,
        images: Vec<(&str, lopdf::ObjectId)>,
    ) -> lopdf::ObjectId {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let mut xobjects = Dictionary::new();
        for (name, id) in images {
            xobjects.set(name, id);
        }
        doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! { "XObject" => xobjects },
        })
    }

    #[test]
    fn test_extracts_supported_images_per_page() {
        let dir = TempDir::new().unwrap();
        let pdf_path = dir.path().join("doc.pdf");
        fixture_pdf(&pdf_path);

        let images_dir = dir.path().join("images");
        let records = extract_images(&pdf_path, &images_dir).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].page, 1);
        assert!(records[0].file_path.ends_with("page_1_img_1.jpg"));
        assert_eq!(records[1].page, 2);
        assert!(records[1].file_path.ends_with("page_2_img_1.jpg"));

        // Image bytes are written verbatim
        assert_eq!(
            std::fs::read(&records[0].file_path).unwrap(),
            b"jpeg-bytes-a"
        );

        // The records file mirrors what was extracted
        let raw = std::fs::read(images_dir.join("images.json")).unwrap();
        let from_disk: Vec<ImageRecord> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(from_disk, records);
    }

    #[test]
    fn test_reingestion_replaces_prior_images() {
        let dir = TempDir::new().unwrap();
        let pdf_path = dir.path().join("doc.pdf");
        fixture_pdf(&pdf_path);

        let images_dir = dir.path().join("images");
        std::fs::create_dir_all(&images_dir).unwrap();
        std::fs::write(images_dir.join("page_9_img_9.jpg"), b"stale").unwrap();

        extract_images(&pdf_path, &images_dir).unwrap();
        assert!(!images_dir.join("page_9_img_9.jpg").exists());
    }

    #[test]
    fn test_unreadable_pdf_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = extract_images(Path::new("/nonexistent.pdf"), dir.path()).unwrap_err();
        assert!(matches!(err, IngestionError::PdfUnreadable { .. }));
    }
}
