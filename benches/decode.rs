use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_barcode::utils::binarization::otsu_binarize;
use rust_barcode::utils::grayscale::rgb_to_grayscale;
use rust_barcode::{
    BarcodeFormat, BinaryBitmap, BitMatrix, DecodeHints, EncodeHints, GrayLuminanceSource, MultiFormatReader,
    MultiFormatWriter, Reader, Writer,
};

fn rendered(format: BarcodeFormat, text: &str, size: usize) -> Vec<u8> {
    let symbol: BitMatrix = MultiFormatWriter
        .encode(text, format, size, size, &EncodeHints::default())
        .expect("benchmark symbol");
    let mut pixels = vec![255u8; size * size];
    for y in 0..symbol.height().min(size) {
        for x in 0..symbol.width().min(size) {
            if symbol.get(x, y) {
                pixels[y * size + x] = 0;
            }
        }
    }
    pixels
}

fn bench_decode_qr(c: &mut Criterion) {
    let pixels = rendered(BarcodeFormat::QrCode, "https://example.com/benchmark", 400);
    let hints = DecodeHints::default().with_formats([BarcodeFormat::QrCode]);
    c.bench_function("decode_qr_400x400", |b| {
        b.iter(|| {
            let image = BinaryBitmap::from_luminance(GrayLuminanceSource::new(pixels.clone(), 400, 400));
            MultiFormatReader::new().decode(black_box(&image), &hints)
        })
    });
}

fn bench_decode_all_formats(c: &mut Criterion) {
    let pixels = rendered(BarcodeFormat::DataMatrix, "benchmark payload", 400);
    c.bench_function("decode_default_plan_datamatrix_400x400", |b| {
        b.iter(|| {
            let image = BinaryBitmap::from_luminance(GrayLuminanceSource::new(pixels.clone(), 400, 400));
            MultiFormatReader::new().decode(black_box(&image), &DecodeHints::default())
        })
    });
}

fn bench_front_end(c: &mut Criterion) {
    let image = vec![128u8; 640 * 480 * 3];
    c.bench_function("rgb_to_gray_binarize_640x480", |b| {
        b.iter(|| {
            let gray = rgb_to_grayscale(black_box(&image), 640, 480);
            otsu_binarize(&gray, 640, 480)
        })
    });
}

criterion_group!(benches, bench_decode_qr, bench_decode_all_formats, bench_front_end);
criterion_main!(benches);
