//! PNG embedding: one image per page, drawn at its natural size

use std::io::Write;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::GenericImageView;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use crate::error::Result;

/// Resource name the image is drawn under on its page
const IMAGE_RESOURCE: &str = "Im0";

/// A decoded PNG ready to be written as an image XObject
#[derive(Debug, Clone)]
pub struct EmbeddedPng {
    /// Width in pixels (also the page width in points)
    pub width: u32,
    /// Height in pixels (also the page height in points)
    pub height: u32,
    /// `DeviceGray` or `DeviceRGB`
    pub color_space: &'static str,
    /// Flate-compressed 8-bit samples
    pub data: Vec<u8>,
    /// Flate-compressed 8-bit alpha channel, if the PNG has one
    pub alpha: Option<Vec<u8>>,
}

impl EmbeddedPng {
    /// Decode PNG bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?;
        let (width, height) = img.dimensions();
        let pixel_count = (width as usize) * (height as usize);

        let (color_space, samples, alpha) = match img.color() {
            image::ColorType::L8 | image::ColorType::L16 => {
                ("DeviceGray", img.to_luma8().into_raw(), None)
            }
            image::ColorType::La8 | image::ColorType::La16 => {
                let gray_alpha = img.to_luma_alpha8();
                let mut gray = Vec::with_capacity(pixel_count);
                let mut alpha = Vec::with_capacity(pixel_count);
                for pixel in gray_alpha.pixels() {
                    gray.push(pixel.0[0]);
                    alpha.push(pixel.0[1]);
                }
                ("DeviceGray", gray, Some(alpha))
            }
            image::ColorType::Rgba8 | image::ColorType::Rgba16 => {
                let rgba = img.to_rgba8();
                let mut rgb = Vec::with_capacity(pixel_count * 3);
                let mut alpha = Vec::with_capacity(pixel_count);
                for pixel in rgba.pixels() {
                    rgb.extend_from_slice(&pixel.0[..3]);
                    alpha.push(pixel.0[3]);
                }
                ("DeviceRGB", rgb, Some(alpha))
            }
            // RGB and anything exotic
            _ => ("DeviceRGB", img.to_rgb8().into_raw(), None),
        };

        // Fully opaque alpha adds nothing
        let alpha = alpha.filter(|a| a.iter().any(|&v| v != u8::MAX));

        log::debug!(
            "Decoded PNG {}x{} ({}, alpha: {})",
            width,
            height,
            color_space,
            alpha.is_some()
        );

        Ok(Self {
            width,
            height,
            color_space,
            data: deflate(&samples)?,
            alpha: alpha.map(|a| deflate(&a)).transpose()?,
        })
    }

    /// Add the image (and its soft mask) to a document, returning the image XObject id
    pub fn add_to(&self, doc: &mut Document) -> ObjectId {
        let mut image_dict = image_dictionary(self.width, self.height, self.color_space);

        if let Some(alpha) = &self.alpha {
            let mask = Stream::new(
                image_dictionary(self.width, self.height, "DeviceGray"),
                alpha.clone(),
            )
            .with_compression(false);
            let mask_id = doc.add_object(mask);
            image_dict.set("SMask", Object::Reference(mask_id));
        }

        doc.add_object(Stream::new(image_dict, self.data.clone()).with_compression(false))
    }
}

/// Add a page showing `image` at full size, parented to `pages_id`
///
/// The page is `width x height` points with the image drawn from the origin.
/// Returns the new page's id; the caller is responsible for listing it in `Kids`.
pub fn add_image_page(doc: &mut Document, pages_id: ObjectId, image: &EmbeddedPng) -> Result<ObjectId> {
    let image_id = image.add_to(doc);
    let width = i64::from(image.width);
    let height = i64::from(image.height);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(height),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page = dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width),
            Object::Integer(height),
        ],
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                IMAGE_RESOURCE => Object::Reference(image_id),
            },
        },
        "Contents" => Object::Reference(content_id),
    };

    Ok(doc.add_object(page))
}

fn image_dictionary(width: u32, height: u32, color_space: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => Object::Name(color_space.as_bytes().to_vec()),
        "BitsPerComponent" => Object::Integer(8),
        "Filter" => "FlateDecode",
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
