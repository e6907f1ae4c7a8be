// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::{anyhow, bail, Context, Result};
use ligmacore::canvas::{ApplicationContext, Image};
use ligmacore::logging::{init_logging, init_verbose_logging};
use ligmacore::paint::{BaseType, ImageType, Layer, LayerMode, PixelBuffer};
use regex::Regex;
use std::{path::Path, process::ExitCode, str::FromStr};

#[derive(Copy, Clone, Debug)]
pub struct ImageSize {
    width: usize,
    height: usize,
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((a, b)) = s.to_lowercase().split_once('x') {
            let width: usize = a.parse().unwrap_or(0);
            let height: usize = b.parse().unwrap_or(0);
            if width != 0 && height != 0 {
                return Ok(ImageSize { width, height });
            }
        }
        Err(format!(
            "Invalid canvas size '{s}', must be given as WIDTHxHEIGHT"
        ))
    }
}

/// A layer given on the command line as `path[@x,y][:opacity][:mode]`
#[derive(Clone, Debug, PartialEq)]
struct LayerSpec {
    path: String,
    x: i32,
    y: i32,
    opacity: f32,
    mode: LayerMode,
}

fn parse_layer_spec(re: &Regex, s: &str) -> Result<LayerSpec> {
    let caps = re
        .captures(s)
        .ok_or_else(|| anyhow!("Invalid layer '{}', expected path[@x,y][:opacity][:mode]", s))?;

    let int = |name: &str| -> Result<i32> {
        caps.name(name)
            .map_or(Ok(0), |m| m.as_str().parse())
            .with_context(|| format!("Invalid layer position in '{}'", s))
    };

    let opacity = match caps.name("opacity") {
        Some(m) => m
            .as_str()
            .parse::<f32>()
            .with_context(|| format!("Invalid opacity in '{}'", s))?,
        None => 1.0,
    };
    if !(0.0..=1.0).contains(&opacity) {
        bail!("Opacity must be between 0 and 1 in '{}'", s);
    }

    let mode = match caps.name("mode") {
        Some(m) => LayerMode::from_name(m.as_str())
            .ok_or_else(|| anyhow!("Unknown layer mode '{}'", m.as_str()))?,
        None => LayerMode::Normal,
    };

    Ok(LayerSpec {
        path: caps["path"].to_owned(),
        x: int("x")?,
        y: int("y")?,
        opacity,
        mode,
    })
}

fn layer_spec_regex() -> Regex {
    Regex::new(
        r"\A(?P<path>[^@:]+)(?:@(?P<x>-?\d+),(?P<y>-?\d+))?(?::(?P<opacity>\d*\.?\d+))?(?::(?P<mode>[a-z-]+))?\z",
    )
    .unwrap()
}

fn load_png(path: &str) -> Result<PixelBuffer> {
    let img = image::open(path)
        .with_context(|| format!("Error loading '{}'", path))?
        .into_rgba8();
    let (w, h) = img.dimensions();
    Ok(PixelBuffer::from_pixels(
        w as usize,
        h as usize,
        ImageType::Rgba,
        img.into_raw(),
    )?)
}

fn flatten(specs: &[LayerSpec], size: Option<ImageSize>, out_path: &str) -> Result<()> {
    let mut ctx = ApplicationContext::default();

    let mut buffers = Vec::with_capacity(specs.len());
    for spec in specs {
        buffers.push(load_png(&spec.path)?);
    }

    let (width, height) = match (size, buffers.first()) {
        (Some(ImageSize { width, height }), _) => (width, height),
        (None, Some(b)) => (b.width(), b.height()),
        (None, None) => bail!("No layers given"),
    };

    let mut canvas = Image::new(&ctx, width, height, BaseType::Rgb);
    for (spec, buffer) in specs.iter().zip(buffers) {
        let title = Path::new(&spec.path)
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy();
        let mut layer = Layer::from_buffer(ctx.next_layer_id()?, &title, buffer).at(spec.x, spec.y);
        layer.metadata.opacity = spec.opacity;
        layer.metadata.mode = spec.mode;
        canvas.add_layer(layer)?;
    }

    canvas.flush()?;

    let projection = canvas.projection();
    let out = image::RgbaImage::from_raw(
        projection.width() as u32,
        projection.height() as u32,
        projection.pixels().to_vec(),
    )
    .ok_or_else(|| anyhow!("Projection has unexpected size"))?;
    out.save(out_path)
        .with_context(|| format!("Error writing '{}'", out_path))?;
    Ok(())
}

fn main() -> ExitCode {
    let flags = xflags::parse_or_exit! {
        /// Displays version information and exits.
        optional -v,--version
        /// Print extra debugging information.
        optional -V,--verbose
        /// Output PNG file. Required.
        required -o,--out output_path: String
        /// Canvas size in the form WIDTHxHEIGHT. Defaults to the size of the
        /// first layer.
        optional -s,--size size: ImageSize
        /// Input layers, bottom first, in the form path[@x,y][:opacity][:mode].
        /// Opacity is between 0 and 1, mode is a name like 'multiply' or
        /// 'darken-only'.
        repeated layers: String
    };

    if flags.version {
        println!("ligma-flatten {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    if flags.verbose {
        init_verbose_logging();
    } else {
        init_logging();
    }

    if flags.layers.is_empty() {
        eprintln!("No layers given");
        return ExitCode::from(2);
    }

    let re = layer_spec_regex();
    let specs: Result<Vec<LayerSpec>> = flags
        .layers
        .iter()
        .map(|s| parse_layer_spec(&re, s))
        .collect();
    let specs = match specs {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    match flatten(&specs, flags.size, &flags.out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_spec() {
        let re = layer_spec_regex();
        assert_eq!(
            parse_layer_spec(&re, "bg.png").unwrap(),
            LayerSpec {
                path: "bg.png".to_owned(),
                x: 0,
                y: 0,
                opacity: 1.0,
                mode: LayerMode::Normal,
            }
        );
        assert_eq!(
            parse_layer_spec(&re, "dir/top.png@-4,10:0.5:darken-only").unwrap(),
            LayerSpec {
                path: "dir/top.png".to_owned(),
                x: -4,
                y: 10,
                opacity: 0.5,
                mode: LayerMode::DarkenOnly,
            }
        );
        assert_eq!(
            parse_layer_spec(&re, "a.png:.25").unwrap().opacity,
            0.25
        );
        assert!(parse_layer_spec(&re, "a.png:2").is_err());
        assert!(parse_layer_spec(&re, "a.png:0.5:nosuchmode").is_err());
        assert!(parse_layer_spec(&re, "a.png@1").is_err());
    }

    #[test]
    fn test_image_size() {
        let s: ImageSize = "640X480".parse().unwrap();
        assert_eq!((s.width, s.height), (640, 480));
        assert!("640".parse::<ImageSize>().is_err());
        assert!("0x10".parse::<ImageSize>().is_err());
    }
}
