//! Plain-text PPM (`P3`) output.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::renderer::ImageBuffer;

/// Write `image` as an ASCII PPM: header, then one `r g b` triple per line.
pub fn write_ppm<W: Write>(image: &ImageBuffer, mut out: W) -> io::Result<()> {
    writeln!(out, "P3")?;
    writeln!(out, "{} {}", image.width, image.height)?;
    writeln!(out, "255")?;
    for color in image.pixels() {
        let [r, g, b] = color.quantize();
        writeln!(out, "{r} {g} {b}")?;
    }
    out.flush()
}

/// Write `image` to a PPM file at `path`.
pub fn save_ppm<P: AsRef<Path>>(image: &ImageBuffer, path: P) -> io::Result<()> {
    let file = File::create(path.as_ref())?;
    write_ppm(image, BufWriter::new(file))?;
    log::info!("Wrote {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lux_math::Color;

    #[test]
    fn test_write_ppm() {
        let mut image = ImageBuffer::new(2, 1);
        image.set(0, 0, Color::new(1.0, 0.5, 0.0).unwrap());
        // Accumulated light can exceed 1; it is clamped on output
        image.set(1, 0, Color::WHITE * 2.0);

        let mut out = Vec::new();
        write_ppm(&image, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "P3\n2 1\n255\n255 128 0\n255 255 255\n");
    }

    #[test]
    fn test_save_ppm() {
        let path = std::env::temp_dir().join(format!("lux_output_test_{}.ppm", std::process::id()));
        save_ppm(&ImageBuffer::new(1, 2), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "P3\n1 2\n255\n0 0 0\n0 0 0\n");
        std::fs::remove_file(&path).unwrap();
    }
}
