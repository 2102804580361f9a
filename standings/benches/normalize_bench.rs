//! Benchmarks for row normalization helpers.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use standings::normalize::{coerce_number, dict_as_number, similarity, split_flag_prefix};
use standings::table::ParsedTable;

fn results_page(rows: usize) -> String {
    let mut html = String::from(
        "<table><tr><td>Coders</td><td>Division Placed</td><td>Point Total</td><td>Old Rating</td></tr>",
    );
    for i in 0..rows {
        html.push_str(&format!(
            "<tr><td><a href=\"/stat?c=coder_room_stats&cr={i}\">coder{i}</a></td><td>{i}</td><td>{},25</td><td></td></tr>",
            1000 - i
        ));
    }
    html.push_str("</table>");
    html
}

fn normalize_benchmark(c: &mut Criterion) {
    c.bench_function("coerce_number", |b| {
        b.iter(|| {
            for raw in ["1234,56", "42", "3.5", "N/A", "=7"] {
                black_box(coerce_number(black_box(raw)));
            }
        });
    });

    c.bench_function("similarity", |b| {
        b.iter(|| similarity(black_box("TCO19 SRM 752"), black_box("SRM 752 Finals")));
    });

    c.bench_function("split_flag_prefix", |b| {
        b.iter(|| split_flag_prefix(black_box("\u{1F1F5}\u{1F1F1} \u{1F1FA}\u{1F1E6} Pierogi")));
    });

    let page = results_page(500);
    c.bench_function("parse_results_table_500", |b| {
        b.iter(|| {
            let table = ParsedTable::parse(black_box(&page)).unwrap_or_default();
            for i in 0..table.len() {
                black_box(dict_as_number(table.record(i).map(|(k, cell)| (k, cell.value.as_str()))));
            }
        });
    });
}

criterion_group!(benches, normalize_benchmark);
criterion_main!(benches);
