use image::{DynamicImage, RgbaImage, imageops::FilterType};

use crate::{error::PatchError, fields::FieldTree, utils::Logger};

/// Uncompressed texture layouts the baker can produce. Values are the
/// engine's `m_TextureFormat` numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Alpha8,
    Argb4444,
    Rgb24,
    Rgba32,
    Argb32,
    Rgb565,
    Rgba4444,
    Bgra32,
    Rg16,
    R8,
}

impl TextureFormat {
    pub fn from_raw(raw: i32) -> Result<Self, PatchError> {
        Ok(match raw {
            1 => TextureFormat::Alpha8,
            2 => TextureFormat::Argb4444,
            3 => TextureFormat::Rgb24,
            4 => TextureFormat::Rgba32,
            5 => TextureFormat::Argb32,
            7 => TextureFormat::Rgb565,
            13 => TextureFormat::Rgba4444,
            14 => TextureFormat::Bgra32,
            62 => TextureFormat::Rg16,
            63 => TextureFormat::R8,
            other => return Err(PatchError::UnsupportedTextureFormat(other)),
        })
    }

    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            TextureFormat::Alpha8 | TextureFormat::R8 => 1,
            TextureFormat::Argb4444
            | TextureFormat::Rgb565
            | TextureFormat::Rgba4444
            | TextureFormat::Rg16 => 2,
            TextureFormat::Rgb24 => 3,
            TextureFormat::Rgba32 | TextureFormat::Argb32 | TextureFormat::Bgra32 => 4,
        }
    }

    fn write_pixel(&self, [r, g, b, a]: [u8; 4], out: &mut Vec<u8>) {
        let nibble = |v: u8| (v >> 4) as u16;
        match self {
            TextureFormat::Alpha8 => out.push(a),
            TextureFormat::R8 => out.push(r),
            TextureFormat::Rg16 => out.extend_from_slice(&[r, g]),
            TextureFormat::Rgb24 => out.extend_from_slice(&[r, g, b]),
            TextureFormat::Rgba32 => out.extend_from_slice(&[r, g, b, a]),
            TextureFormat::Argb32 => out.extend_from_slice(&[a, r, g, b]),
            TextureFormat::Bgra32 => out.extend_from_slice(&[b, g, r, a]),
            TextureFormat::Argb4444 => {
                let packed = nibble(a) << 12 | nibble(r) << 8 | nibble(g) << 4 | nibble(b);
                out.extend_from_slice(&packed.to_le_bytes());
            }
            TextureFormat::Rgba4444 => {
                let packed = nibble(r) << 12 | nibble(g) << 8 | nibble(b) << 4 | nibble(a);
                out.extend_from_slice(&packed.to_le_bytes());
            }
            TextureFormat::Rgb565 => {
                let packed =
                    ((r >> 3) as u16) << 11 | ((g >> 2) as u16) << 5 | (b >> 3) as u16;
                out.extend_from_slice(&packed.to_le_bytes());
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BakedTexture {
    pub width: u32,
    pub height: u32,
    pub mip_count: u32,
    pub data: Vec<u8>,
}

/// Textures that never had mipmaps keep a single level. Carrying over any
/// other stored count makes the game sample garbage levels.
pub fn resolve_mip_count(has_mipmaps: bool, original: i32) -> u32 {
    if has_mipmaps {
        original.max(1) as u32
    } else {
        1
    }
}

fn max_mip_levels(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

fn to_rgba(image: &DynamicImage) -> RgbaImage {
    match image {
        DynamicImage::ImageRgba8(img) => img.clone(),
        other => other.to_rgba8(),
    }
}

/// Encodes `image` bottom-up into `format`, followed by up to `mip_count - 1`
/// successively halved levels.
pub fn encode_image(image: &DynamicImage, format: TextureFormat, mip_count: u32) -> BakedTexture {
    let base = image::imageops::flip_vertical(&to_rgba(image));
    let (width, height) = base.dimensions();
    let levels = mip_count.clamp(1, max_mip_levels(width, height));

    let mut data = Vec::new();
    let mut level = base;
    for idx in 0..levels {
        if idx > 0 {
            let w = (width >> idx).max(1);
            let h = (height >> idx).max(1);
            level = image::imageops::resize(&level, w, h, FilterType::Triangle);
        }
        data.reserve((level.width() * level.height()) as usize * format.bytes_per_pixel());
        for pixel in level.pixels() {
            format.write_pixel(pixel.0, &mut data);
        }
    }

    BakedTexture {
        width,
        height,
        mip_count: levels,
        data,
    }
}

/// Overwrites the pixel payload of a Texture2D tree with `image`, encoded in
/// the texture's existing format.
pub fn bake_texture(
    tree: &mut FieldTree,
    image: &DynamicImage,
    logger: &Logger,
) -> Result<BakedTexture, PatchError> {
    let format = TextureFormat::from_raw(tree.i32("m_TextureFormat")?)?;
    let has_mipmaps = tree
        .find("m_MipMap")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let stored_mips = match tree.find("m_MipCount") {
        Some(_) => Some(tree.i32("m_MipCount")?),
        None => None,
    };
    let requested = resolve_mip_count(has_mipmaps, stored_mips.unwrap_or(1));

    if tree
        .find("m_PlatformBlob")
        .and_then(|v| v.as_byte_vec())
        .is_some_and(|blob| !blob.is_empty())
    {
        logger.warn(format!(
            "texture {} carries a platform blob; pixels are written unswizzled",
            tree.name().unwrap_or("<unnamed>")
        ));
    }

    let baked = encode_image(image, format, requested);

    tree.set_integer("m_Width", baked.width as i64)?;
    tree.set_integer("m_Height", baked.height as i64)?;
    if stored_mips.is_some() {
        tree.set_integer("m_MipCount", baked.mip_count as i64)?;
    }
    tree.set_integer("m_CompleteImageSize", baked.data.len() as i64)?;
    tree.set_bytes("image data", baked.data.clone())?;
    tree.set_integer("m_StreamData/offset", 0)?;
    tree.set_integer("m_StreamData/size", 0)?;
    tree.set_string("m_StreamData/path", "")?;

    Ok(baked)
}
