//! Single-page PDF documents wrapping a JPEG raster.

use crate::export::{ExportError, ExportResult};
use easel_core::design::Dimensions;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

/// JPEG quality of the embedded raster.
pub const PDF_RASTER_QUALITY: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
}

impl PageOrientation {
    pub fn for_dimensions(dimensions: Dimensions) -> Self {
        if dimensions.is_landscape() {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        }
    }
}

/// Page box in canvas pixel units, long side following the orientation.
pub fn page_size(dimensions: Dimensions) -> (PageOrientation, u32, u32) {
    let orientation = PageOrientation::for_dimensions(dimensions);
    let (long, short) = (
        dimensions.width.max(dimensions.height),
        dimensions.width.min(dimensions.height),
    );
    match orientation {
        PageOrientation::Landscape => (orientation, long, short),
        PageOrientation::Portrait => (orientation, short, long),
    }
}

/// Build a one-page PDF showing `jpeg` stretched over the whole page.
pub fn write_pdf(jpeg: &[u8], pixel_width: u32, pixel_height: u32, dimensions: Dimensions) -> ExportResult<Vec<u8>> {
    let (_, page_width, page_height) = page_size(dimensions);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(pixel_width),
            "Height" => i64::from(pixel_height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg.to_vec(),
    )
    .with_compression(false);
    let image_id = doc.add_object(image);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    i64::from(page_width).into(),
                    0.into(),
                    0.into(),
                    i64::from(page_height).into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| ExportError::Pdf(format!("content stream: {e}")))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    });
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), i64::from(page_width).into(), i64::from(page_height).into()],
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| ExportError::Pdf(format!("write: {e}")))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_follows_aspect() {
        assert_eq!(page_size(Dimensions::new(1920, 1080)), (PageOrientation::Landscape, 1920, 1080));
        assert_eq!(page_size(Dimensions::new(1080, 1920)), (PageOrientation::Portrait, 1080, 1920));
        assert_eq!(page_size(Dimensions::new(1080, 1080)), (PageOrientation::Portrait, 1080, 1080));
    }

    #[test]
    fn test_pdf_has_one_page_with_media_box() {
        let bytes = write_pdf(&[0xFF, 0xD8, 0xFF, 0xD9], 2, 1, Dimensions::new(200, 100)).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page = doc.get_dictionary(*pages.values().next().unwrap()).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_i64().unwrap(), 200);
        assert_eq!(media_box[3].as_i64().unwrap(), 100);
    }
}
