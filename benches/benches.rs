use criterion::{Criterion, black_box, criterion_group, criterion_main};
use disk_matrix::DiskMatrix;

const ROWS: usize = 10_000;
const COLS: usize = 8;

fn matrix(dir: &tempfile::TempDir, max_rows: usize, max_cols: usize) -> DiskMatrix {
    let mut matrix = DiskMatrix::new("bench", dir.path(), max_rows, max_cols).unwrap();
    matrix.set_rows(ROWS);
    for _ in 0..COLS {
        matrix.add_column().unwrap();
    }
    matrix
}

fn column_streaming(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut matrix = matrix(&dir, 128, 2);
    let column: Vec<f64> = (0..ROWS).map(|i| i as f64).collect();

    c.bench_function("write whole columns", |b| {
        b.iter(|| {
            // Alternating between more columns than the buffer holds forces the eviction path.
            for col in 0..4 {
                matrix.write_columns(black_box(&[col]), black_box(&column)).unwrap();
            }
        })
    });
    c.bench_function("read whole columns", |b| {
        b.iter(|| {
            for col in 0..4 {
                black_box(matrix.read_columns(black_box(&[col])).unwrap());
            }
        })
    });
}

fn cell_access_across_a_row(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut matrix = matrix(&dir, 128, 2);

    c.bench_function("row sweep in column mode", |b| {
        b.iter(|| {
            for col in 0..COLS {
                black_box(matrix.value(black_box(5_000), col).unwrap());
            }
        })
    });

    matrix.set_row_mode().unwrap();
    c.bench_function("row sweep in row mode", |b| {
        b.iter(|| {
            for col in 0..COLS {
                black_box(matrix.value(black_box(5_000), col).unwrap());
            }
        })
    });
}

criterion_group!(benches, column_streaming, cell_access_across_a_row);
criterion_main!(benches);
