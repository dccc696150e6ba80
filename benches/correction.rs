use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use snapscan_capture_rs::hsi_pipeline::buffers::{
    BufferAllocator, CorrectionCoefficients, CorrectionMatrix, CubeFloat, CubeShape,
};
use snapscan_capture_rs::hsi_pipeline::correction::{
    DEFAULT_WHITE_REFERENCE_FACTOR, apply_spectral_correction, apply_white_reference,
};

const RAW_BANDS: usize = 16;
const CORRECTED_BANDS: usize = 12;

fn mock_raw_cube(allocator: &BufferAllocator, width: usize, height: usize) -> CubeFloat {
    let wavelengths: Vec<f32> = (0..RAW_BANDS).map(|b| 470.0 + 25.0 * b as f32).collect();
    let mut cube = allocator
        .allocate_cube_with_shape(CubeShape::new(width, height, RAW_BANDS), &wavelengths, "cube")
        .unwrap();
    for (i, value) in cube.data_mut().iter_mut().enumerate() {
        *value = (i % 4095 + 1) as f32;
    }
    cube.set_valid(true);
    cube
}

fn mock_matrix(allocator: &BufferAllocator) -> CorrectionMatrix {
    let mut coefficients = vec![0.0; CORRECTED_BANDS * RAW_BANDS];
    for j in 0..CORRECTED_BANDS {
        let i = j * (RAW_BANDS - 1) / (CORRECTED_BANDS - 1);
        coefficients[j * RAW_BANDS + i] = 0.6;
        if i + 1 < RAW_BANDS {
            coefficients[j * RAW_BANDS + i + 1] = 0.4;
        }
    }
    allocator
        .allocate_correction_matrix(CorrectionCoefficients {
            raw_bands: RAW_BANDS,
            corrected_bands: CORRECTED_BANDS,
            coefficients,
            wavelengths_nm: (0..CORRECTED_BANDS).map(|b| 480.0 + 35.0 * b as f32).collect(),
        })
        .unwrap()
}

fn benchmark_spectral_correction(c: &mut Criterion) {
    let mut group = c.benchmark_group("spectral_correction");

    let sizes = vec![
        (256, 256, "256x256"),
        (1024, 512, "1024x512"),
        (2048, 1088, "2048x1088"),
    ];

    for (width, height, label) in sizes {
        let allocator = BufferAllocator::default();
        let raw = mock_raw_cube(&allocator, width, height);
        let matrix = mock_matrix(&allocator);
        let mut corrected = allocator
            .allocate_cube_with_shape(
                CubeShape::new(width, height, CORRECTED_BANDS),
                matrix.wavelengths_nm(),
                "cube_corrected",
            )
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(label), &raw, |b, raw| {
            b.iter(|| {
                let _ = apply_spectral_correction(&mut corrected, black_box(raw), &matrix);
            });
        });
    }

    group.finish();
}

fn benchmark_white_reference(c: &mut Criterion) {
    let mut group = c.benchmark_group("white_reference");

    for (width, height, label) in [(256, 256, "256x256"), (2048, 1088, "2048x1088")] {
        let allocator = BufferAllocator::default();
        let reference = mock_raw_cube(&allocator, width, height);
        let mut sample = mock_raw_cube(&allocator, width, height);

        group.bench_function(label, |b| {
            b.iter(|| {
                let _ = apply_white_reference(
                    &mut sample,
                    black_box(&reference),
                    DEFAULT_WHITE_REFERENCE_FACTOR,
                );
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_spectral_correction, benchmark_white_reference);
criterion_main!(benches);
