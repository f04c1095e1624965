use std::io::Cursor;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageedi_contracts::image::EncodedImage;
use imageedi_contracts::models::{ModelRegistry, CAPABILITY_IMAGE};
use sha2::{Digest, Sha256};

use crate::parts::{Candidate, Part};
use crate::upstream::{ContentUpstream, Credential};

const DRYRUN_EDGE: u32 = 256;

/// Offline stand-in for the model. Image-capable models answer with a solid
/// PNG whose colour is derived from the request; text models echo the prompt.
pub struct DryrunUpstream {
    registry: ModelRegistry,
}

impl Default for DryrunUpstream {
    fn default() -> Self {
        Self {
            registry: ModelRegistry::new(None),
        }
    }
}

impl DryrunUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    fn produces_images(&self, model: &str) -> bool {
        self.registry
            .get(model)
            .map(|spec| spec.supports(CAPABILITY_IMAGE))
            .unwrap_or(false)
    }
}

impl ContentUpstream for DryrunUpstream {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate_content(
        &self,
        model: &str,
        _credential: &Credential,
        parts: &[Part],
    ) -> Result<Vec<Candidate>> {
        let prompt = parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                Part::InlineImage(_) => None,
            })
            .last()
            .unwrap_or_default();
        let image_count = parts
            .iter()
            .filter(|part| matches!(part, Part::InlineImage(_)))
            .count();

        let mut out = Vec::new();
        if self.produces_images(model) {
            let (r, g, b) = color_from_prompt(prompt, image_count as u64);
            out.push(Part::InlineImage(solid_png(r, g, b)?));
            out.push(Part::Text(format!(
                "Dry run ({model}) with {image_count} input image(s)."
            )));
        } else {
            out.push(Part::Text(prompt.trim().to_string()));
        }
        Ok(vec![Candidate { parts: out }])
    }
}

fn solid_png(r: u8, g: u8, b: u8) -> Result<EncodedImage> {
    let mut image = RgbImage::new(DRYRUN_EDGE, DRYRUN_EDGE);
    for pixel in image.pixels_mut() {
        *pixel = Rgb([r, g, b]);
    }
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("failed to encode dry-run image")?;
    Ok(EncodedImage::from_bytes("image/png", &bytes))
}

fn color_from_prompt(prompt: &str, seed: u64) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(seed.to_be_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}
