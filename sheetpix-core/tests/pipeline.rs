use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use sheetpix_core::decode::XlsxReader;
use sheetpix_core::format::{ColorKey, GridDocument, COLUMN_WIDTH, ROW_HEIGHT, SHEET_NAME};
use sheetpix_core::pipeline::{decode_image, prepare_image};
use sheetpix_core::quantize::count_colors;
use sheetpix_core::{convert, ConversionConfig, ConversionError, ResampleKernel};

fn png_bytes(img: &RgbImage) -> Vec<u8> {
    encoded(img, ImageFormat::Png)
}

fn encoded(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn close_to(actual: ColorKey, expected: [u8; 3], tolerance: u8) -> bool {
    actual
        .to_rgb()
        .iter()
        .zip(expected)
        .all(|(&a, e)| a.abs_diff(e) <= tolerance)
}

fn read_back(bytes: Vec<u8>) -> GridDocument {
    XlsxReader::new(Cursor::new(bytes))
        .unwrap()
        .read_document()
        .unwrap()
}

#[test]
fn solid_red_without_resize() {
    let bytes = png_bytes(&RgbImage::from_pixel(4, 4, Rgb([255, 0, 0])));
    let cfg = ConversionConfig { should_resize: false, ..Default::default() };

    let doc = read_back(convert(&bytes, &cfg, None).unwrap());

    assert_eq!((doc.width(), doc.height()), (4, 4));
    assert_eq!(doc.fills().len(), 1);
    assert_eq!(doc.sheet_name, SHEET_NAME);
    assert!(!doc.show_gridlines());
    for row in 1..=4 {
        assert_eq!(doc.row_height(row), Some(ROW_HEIGHT));
        for col in 1..=4 {
            assert_eq!(doc.cell_color(row, col).unwrap().hex(), "ff0000");
        }
    }
    assert_eq!(doc.column_width(1), Some(COLUMN_WIDTH));
}

#[test]
fn wide_image_is_shrunk_keeping_aspect() {
    let img = RgbImage::from_fn(300, 200, |x, y| Rgb([(x % 7) as u8 * 30, (y % 5) as u8 * 40, 0]));
    let cfg = ConversionConfig {
        should_resize: true,
        max_dimension: 100,
        kernel: ResampleKernel::Nearest,
        ..Default::default()
    };

    let doc = read_back(convert(&png_bytes(&img), &cfg, None).unwrap());
    assert_eq!((doc.width(), doc.height()), (100, 66));
}

#[test]
fn many_colors_are_quantized() {
    // 250 x 200 = 50,000 pixels, every one a different color.
    let img = RgbImage::from_fn(250, 200, |x, y| {
        let i = y * 250 + x;
        Rgb([(i % 256) as u8, (i / 256) as u8, ((x * 3 + y) % 256) as u8])
    });
    assert_eq!(count_colors(&img), 50_000);

    let cfg = ConversionConfig {
        should_resize: false,
        color_count: Some(16),
        ..Default::default()
    };
    let doc = read_back(convert(&png_bytes(&img), &cfg, None).unwrap());

    assert_eq!((doc.width(), doc.height()), (250, 200));
    assert!(doc.fills().len() <= 16, "got {} fills", doc.fills().len());
}

#[test]
fn cells_reproduce_the_processed_image() {
    let img = RgbImage::from_fn(90, 45, |x, y| Rgb([(x * 2) as u8, (y * 5) as u8, ((x ^ y) * 3) as u8]));
    let bytes = png_bytes(&img);
    let cfg = ConversionConfig {
        max_dimension: 40,
        kernel: ResampleKernel::Lanczos,
        color_count: Some(32),
        ..Default::default()
    };

    let processed = prepare_image(decode_image(&bytes).unwrap(), &cfg).unwrap();
    let doc = read_back(convert(&bytes, &cfg, None).unwrap());

    assert_eq!(processed.dimensions(), (doc.width(), doc.height()));
    assert!(doc.fills().len() <= count_colors(&processed));
    for (x, y, p) in processed.enumerate_pixels() {
        assert_eq!(doc.cell_color(y + 1, x + 1), Some(ColorKey::from_rgb(p.0)));
    }
}

#[test]
fn conversion_is_deterministic() {
    let img = RgbImage::from_fn(60, 60, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 77]));
    let bytes = png_bytes(&img);
    let cfg = ConversionConfig { color_count: Some(24), ..Default::default() };

    assert_eq!(
        convert(&bytes, &cfg, None).unwrap(),
        convert(&bytes, &cfg, None).unwrap()
    );
}

#[test]
fn progress_reports_every_row() {
    let bytes = png_bytes(&RgbImage::from_pixel(7, 9, Rgb([10, 20, 30])));
    let mut fractions = Vec::new();
    let mut on_progress = |f: f64| fractions.push(f);

    convert(&bytes, &ConversionConfig::default(), Some(&mut on_progress)).unwrap();

    assert_eq!(fractions.len(), 9);
    assert!(fractions.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(fractions.last().copied(), Some(1.0));
}

#[test]
fn transparency_is_dropped() {
    let rgba = RgbaImage::from_pixel(3, 2, Rgba([0, 128, 255, 0]));
    let mut buf = Cursor::new(Vec::new());
    rgba.write_to(&mut buf, ImageFormat::Png).unwrap();

    let doc = read_back(convert(buf.get_ref(), &ConversionConfig::default(), None).unwrap());
    assert_eq!(doc.cell_color(2, 3).unwrap().hex(), "0080ff");
}

#[test]
fn invalid_configuration_is_rejected_before_decoding() {
    let cfg = ConversionConfig { color_count: Some(1000), ..Default::default() };
    assert!(matches!(
        convert(b"", &cfg, None),
        Err(ConversionError::InvalidConfig(_))
    ));
}

#[test]
fn jpeg_input_is_accepted() {
    let img = RgbImage::from_pixel(16, 8, Rgb([200, 100, 50]));
    let cfg = ConversionConfig { should_resize: false, ..Default::default() };

    let doc = read_back(convert(&encoded(&img, ImageFormat::Jpeg), &cfg, None).unwrap());

    assert_eq!((doc.width(), doc.height()), (16, 8));
    let color = doc.cell_color(4, 8).unwrap();
    assert!(close_to(color, [200, 100, 50], 8), "got {color}");
}

#[test]
fn bmp_input_keeps_exact_colors() {
    let img = RgbImage::from_fn(5, 3, |x, y| Rgb([x as u8 * 50, y as u8 * 100, 7]));
    let cfg = ConversionConfig { should_resize: false, ..Default::default() };

    let doc = read_back(convert(&encoded(&img, ImageFormat::Bmp), &cfg, None).unwrap());

    assert_eq!((doc.width(), doc.height()), (5, 3));
    for (x, y, px) in img.enumerate_pixels() {
        assert_eq!(doc.cell_color(y + 1, x + 1), Some(ColorKey::from_rgb(px.0)));
    }
}

#[test]
fn animated_gif_uses_first_frame() {
    use image::codecs::gif::GifEncoder;
    use image::Frame;

    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        encoder
            .encode_frames([
                Frame::new(RgbaImage::from_pixel(6, 4, Rgba([255, 0, 0, 255]))),
                Frame::new(RgbaImage::from_pixel(6, 4, Rgba([0, 0, 255, 255]))),
            ])
            .unwrap();
    }
    let cfg = ConversionConfig { should_resize: false, ..Default::default() };

    let doc = read_back(convert(&buf, &cfg, None).unwrap());

    assert_eq!((doc.width(), doc.height()), (6, 4));
    let color = doc.cell_color(1, 1).unwrap();
    assert!(close_to(color, [255, 0, 0], 16), "got {color}");
}
