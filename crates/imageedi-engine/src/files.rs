use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::ImageReader;
use imageedi_contracts::image::{EncodedImage, ImageError};

/// Reads an image file into an [`EncodedImage`], sniffing the mime type from
/// the content. Files that are not images at all fail with `NotAnImage`;
/// image files that cannot be decoded fail with `Decode`.
pub fn decode_image_file(path: &Path) -> Result<EncodedImage, ImageError> {
    let bytes = fs::read(path)
        .map_err(|err| ImageError::Read(format!("{}: {err}", path.display())))?;
    decode_image_bytes(&bytes, mime_for_path(path))
}

pub fn decode_image_bytes(
    bytes: &[u8],
    mime_hint: Option<&str>,
) -> Result<EncodedImage, ImageError> {
    let Ok(format) = image::guess_format(bytes) else {
        return Err(match mime_hint {
            Some(mime) => ImageError::Decode(format!("content is not valid {mime}")),
            None => ImageError::NotAnImage("unrecognised file content".to_string()),
        });
    };
    ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|err| ImageError::Decode(err.to_string()))?;
    Ok(EncodedImage::from_bytes(format.to_mime_type(), bytes))
}

/// Writes the decoded image bytes to `path`, creating parent directories.
pub fn write_image_file(image: &EncodedImage, path: &Path) -> anyhow::Result<()> {
    let bytes = image.decode_bytes()?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    use super::*;

    fn jpeg_bytes() -> anyhow::Result<Vec<u8>> {
        let image = RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)?;
        Ok(bytes)
    }

    #[test]
    fn mime_comes_from_content_not_extension() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("mislabelled.png");
        fs::write(&path, jpeg_bytes()?)?;

        let decoded = decode_image_file(&path)?;
        assert_eq!(decoded.mime_type, "image/jpeg");
        assert_eq!(decoded.decode_bytes()?, jpeg_bytes()?);
        Ok(())
    }

    #[test]
    fn text_file_is_not_an_image() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("notes.txt");
        fs::write(&path, "hello")?;
        assert!(matches!(
            decode_image_file(&path),
            Err(ImageError::NotAnImage(_))
        ));
        Ok(())
    }

    #[test]
    fn corrupt_image_fails_to_decode() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("broken.png");
        fs::write(&path, b"not really a png")?;
        assert!(matches!(decode_image_file(&path), Err(ImageError::Decode(_))));

        let mut truncated = jpeg_bytes()?;
        truncated.truncate(4);
        assert!(matches!(
            decode_image_bytes(&truncated, None),
            Err(ImageError::Decode(_))
        ));
        Ok(())
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = decode_image_file(Path::new("/definitely/not/here.png"));
        assert!(matches!(err, Err(ImageError::Read(_))));
    }

    #[test]
    fn write_round_trips_bytes() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("out").join("edit.jpg");
        let image = EncodedImage::from_bytes("image/jpeg", &jpeg_bytes()?);
        write_image_file(&image, &path)?;
        assert_eq!(fs::read(&path)?, jpeg_bytes()?);
        Ok(())
    }
}
