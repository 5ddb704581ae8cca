use std::collections::HashMap;

use image::GenericImageView;
use sha2::{Digest, Sha256};

use crate::error::{PdfError, Result};
use crate::object::{Dict, PdfObject, Value, flate_compress, hex_upper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageColorSpace {
    DeviceGray,
    DeviceRgb,
}

impl ImageColorSpace {
    fn pdf_name(self) -> &'static str {
        match self {
            ImageColorSpace::DeviceGray => "DeviceGray",
            ImageColorSpace::DeviceRgb => "DeviceRGB",
        }
    }
}

/// Decoded, ready-to-embed raster image.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Resource index; the image is drawn with `/I{index} Do`.
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub color_space: ImageColorSpace,
    pub bits_per_component: u8,
    pub filter: &'static str,
    pub(crate) data: Vec<u8>,
    pub(crate) smask: Option<Vec<u8>>,
    pub(crate) usages: usize,
}

/// Images of one build, deduplicated by content digest.
#[derive(Debug, Default)]
pub struct ImageCache {
    images: Vec<ImageInfo>,
    by_key: HashMap<String, usize>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes PNG or JPEG bytes (or returns the cached entry) and yields
    /// `(key, index, info)`.
    pub fn preload(&mut self, bytes: &[u8]) -> Result<(String, usize, &ImageInfo)> {
        let key = content_key(bytes);
        if let Some(&pos) = self.by_key.get(&key) {
            let info = &self.images[pos];
            return Ok((key, info.index, info));
        }
        let mut info = decode_image_bytes(bytes)?;
        info.index = self.images.len() + 1;
        Ok(self.insert(key, info))
    }

    /// Registers an 8-bit gray image built from raw coverage values.
    pub(crate) fn preload_gray(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<usize> {
        let mut keyed = Vec::with_capacity(pixels.len() + 8);
        keyed.extend_from_slice(&width.to_be_bytes());
        keyed.extend_from_slice(&height.to_be_bytes());
        keyed.extend_from_slice(pixels);
        let key = format!("gray:{}", content_key(&keyed));
        if let Some(&pos) = self.by_key.get(&key) {
            return Ok(self.images[pos].index);
        }
        let info = ImageInfo {
            index: self.images.len() + 1,
            width,
            height,
            color_space: ImageColorSpace::DeviceGray,
            bits_per_component: 8,
            filter: "FlateDecode",
            data: flate_compress(pixels)?,
            smask: None,
            usages: 0,
        };
        Ok(self.insert(key, info).1)
    }

    fn insert(&mut self, key: String, info: ImageInfo) -> (String, usize, &ImageInfo) {
        let pos = self.images.len();
        self.images.push(info);
        self.by_key.insert(key.clone(), pos);
        let info = &self.images[pos];
        (key, info.index, info)
    }

    pub fn mark_used(&mut self, index: usize) {
        if let Some(info) = index.checked_sub(1).and_then(|pos| self.images.get_mut(pos)) {
            info.usages += 1;
        }
    }

    pub fn get(&self, index: usize) -> Option<&ImageInfo> {
        index.checked_sub(1).and_then(|pos| self.images.get(pos))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Images with at least one usage, by index.
    pub(crate) fn used(&self) -> impl Iterator<Item = &ImageInfo> {
        self.images.iter().filter(|info| info.usages > 0)
    }
}

pub(crate) fn content_key(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex_upper(&digest[..16])
}

fn decode_image_bytes(data: &[u8]) -> Result<ImageInfo> {
    let format = image::guess_format(data).ok();
    let decoded = image::load_from_memory(data)
        .map_err(|err| PdfError::Image(format!("cannot decode image: {err}")))?;
    let (width, height) = decoded.dimensions();

    if matches!(format, Some(image::ImageFormat::Jpeg)) {
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::La8 => ImageColorSpace::DeviceGray,
            _ => ImageColorSpace::DeviceRgb,
        };
        return Ok(ImageInfo {
            index: 0,
            width,
            height,
            color_space,
            bits_per_component: 8,
            filter: "DCTDecode",
            data: data.to_vec(),
            smask: None,
            usages: 0,
        });
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if a != 255 {
            has_alpha = true;
        }
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    Ok(ImageInfo {
        index: 0,
        width,
        height,
        color_space: ImageColorSpace::DeviceRgb,
        bits_per_component: 8,
        filter: "FlateDecode",
        data: flate_compress(&rgb)?,
        smask: has_alpha.then(|| flate_compress(&alpha)).transpose()?,
        usages: 0,
    })
}

/// XObject dictionary and data for an image; the soft mask reference is set by the caller.
pub(crate) fn image_object(info: &ImageInfo) -> PdfObject {
    let dict = Dict::typed("XObject")
        .with("Subtype", Value::name("Image"))
        .with("Width", Value::Int(info.width as i64))
        .with("Height", Value::Int(info.height as i64))
        .with("ColorSpace", Value::name(info.color_space.pdf_name()))
        .with("BitsPerComponent", Value::Int(info.bits_per_component as i64));
    let mut object = PdfObject::stream(dict, info.data.clone());
    if let Some(stream) = object.stream.as_mut() {
        stream.filter = Some(info.filter);
    }
    object
}

pub(crate) fn smask_object(info: &ImageInfo, alpha: &[u8]) -> PdfObject {
    let dict = Dict::typed("XObject")
        .with("Subtype", Value::name("Image"))
        .with("Width", Value::Int(info.width as i64))
        .with("Height", Value::Int(info.height as i64))
        .with("ColorSpace", Value::name("DeviceGray"))
        .with("BitsPerComponent", Value::Int(8));
    PdfObject::compressed(dict, alpha.to_vec())
}

#[cfg(test)]
pub(crate) fn encode_png(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
    use image::ImageEncoder;
    use image::codecs::png::PngEncoder;

    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(rgba, width, height, image::ExtendedColorType::Rgba8)
        .expect("encode png");
    out
}
