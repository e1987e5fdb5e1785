use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use tabmap::convert::{RowErrorPolicy, export_rows, read_table};
use tabmap::io_utils::{CsvRowSink, CsvRowSource};
use tabmap::mapping::{ColumnMapping, MappingConfiguration};
use tabmap::schema::ColumnType;
use tempfile::TempDir;

fn generate_orders(rows: usize) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv_path = temp_dir.path().join("orders.csv");
    let mut file = File::create(&csv_path).expect("create csv");
    writeln!(file, "id,ordered_at,ship_time,amount,status").expect("header");
    for i in 0..rows {
        let status = match i % 3 {
            0 => "shipped",
            1 => "",
            _ => "processing",
        };
        let day = (i % 28) + 1;
        let hour = (i % 23) + 1;
        writeln!(
            file,
            "{i},2024-01-{day:02},{hour:02}:00:00,{}.{:02},{status}",
            i % 500,
            i % 100
        )
        .expect("row");
    }
    (temp_dir, csv_path)
}

fn orders_mapping(csv_path: &std::path::Path) -> MappingConfiguration {
    MappingConfiguration::builder(csv_path.display().to_string())
        .map("id", "order_id", ColumnType::Integer)
        .map("ordered_at", "ordered", ColumnType::Date)
        .map("ship_time", "shipped_at", ColumnType::Time)
        .map("amount", "total", ColumnType::Double)
        .mapping(ColumnMapping::by_name("status", "state", ColumnType::String).with_default("pending"))
        .build()
        .expect("orders mapping")
}

fn bench_import_export(c: &mut Criterion) {
    let (temp_dir, csv_path) = generate_orders(50_000);
    let config = orders_mapping(&csv_path);

    let mut group = c.benchmark_group("mapping_pass");

    group.bench_function("import_csv", |b| {
        b.iter_batched(
            || CsvRowSource::from_config(&config, None).expect("open orders"),
            |mut source| {
                read_table(&mut source, &config, RowErrorPolicy::Abort).expect("import orders");
            },
            BatchSize::SmallInput,
        );
    });

    let mut source = CsvRowSource::from_config(&config, None).expect("open orders");
    let (table, _) = read_table(&mut source, &config, RowErrorPolicy::Abort).expect("import");
    let outbound = tabmap::convert::identity_configuration(&table, "orders-out.csv")
        .expect("identity mapping");

    group.bench_function("export_csv", |b| {
        b.iter_batched(
            || CsvRowSink::new(Vec::with_capacity(4 << 20), b','),
            |mut sink| {
                export_rows(&table, &outbound, &mut sink, RowErrorPolicy::Abort)
                    .expect("export orders");
            },
            BatchSize::SmallInput,
        );
    });

    drop(temp_dir);
    group.finish();
}

criterion_group!(benches, bench_import_export);
criterion_main!(benches);
