use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use pgddl::{Simulator, scope, split_statements};

fn make_migration(tables: usize) -> String {
    let mut sql = String::from("CREATE TYPE status AS ENUM ('active', 'disabled');\n");
    for i in 0..tables {
        sql.push_str(&format!(
            "CREATE TABLE t_{i} (\n\
             \x20   id bigint GENERATED ALWAYS AS IDENTITY PRIMARY KEY,\n\
             \x20   owner_id bigint REFERENCES t_0 (id) ON DELETE CASCADE,\n\
             \x20   name varchar(255) NOT NULL DEFAULT 'unnamed',\n\
             \x20   state status NOT NULL DEFAULT 'active',\n\
             \x20   created_at timestamp without time zone DEFAULT timezone('utc', now()),\n\
             \x20   UNIQUE (owner_id, name),\n\
             \x20   CHECK (char_length(name) > 0)\n\
             );\n\
             ALTER TABLE t_{i} ADD COLUMN note text, ALTER COLUMN name SET DATA TYPE text, RENAME COLUMN note TO remark;\n"
        ));
    }
    sql
}

fn bench_simulate_script(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate/script");

    for tables in [10, 100] {
        let sql = make_migration(tables);
        group.throughput(Throughput::Bytes(sql.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tables), &sql, |b, sql| {
            b.iter(|| {
                let mut sim = Simulator::new();
                sim.simulate_script(black_box(sql)).expect("replay");
                black_box(sim.into_state());
            });
        });
    }

    group.finish();
}

fn bench_split_statements(c: &mut Criterion) {
    let sql = make_migration(100);
    c.bench_function("simulate/split_statements", |b| {
        b.iter(|| black_box(split_statements(black_box(&sql)).expect("split")));
    });
}

fn bench_scope(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate/scope");

    for depth in [1usize, 16, 64] {
        let text = format!(
            "{}'a)b' \"c(d\" `e` \\) x{}",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        group.bench_with_input(BenchmarkId::from_parameter(depth), &text, |b, text| {
            b.iter(|| black_box(scope(black_box(text), 0).expect("scope")));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_simulate_script,
    bench_split_statements,
    bench_scope
);
criterion_main!(benches);
