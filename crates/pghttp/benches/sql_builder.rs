use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pghttp::{Expr, Sql, SqlQb, qb};
use std::hint::black_box;

/// SELECT col0, col1, ... FROM t WHERE col0 = $1 AND col1 = $2 ...
fn build_select_sql(n: usize) -> Sql {
    let mut sql = Sql::new("SELECT ");
    for i in 0..n {
        if i > 0 {
            sql.push(", ");
        }
        sql.push(&format!("col{i}"));
    }
    sql.push(" FROM t WHERE ");
    for i in 0..n {
        if i > 0 {
            sql.push(" AND ");
        }
        sql.push(&format!("col{i} = "));
        sql.push_bind(i as i64);
    }
    sql
}

fn bench_to_sql(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/to_sql");

    for n in [1, 10, 100] {
        let sql = build_select_sql(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &sql, |b, sql| {
            b.iter(|| black_box(sql.to_sql()));
        });
    }

    group.finish();
}

fn bench_push_bind_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/push_bind_list");

    for n in [5, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| {
                let mut sql = Sql::new("SELECT * FROM t WHERE id IN (");
                sql.push_bind_list(values.iter().copied());
                sql.push(")");
                black_box(sql.to_sql());
            });
        });
    }

    group.finish();
}

fn bench_select_qb(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/select_qb");

    for n in [1, 10, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut qb = qb::select("t").order_by("id").limit(20);
                for i in 0..n {
                    qb = qb.and_expr(Expr::or(vec![
                        Expr::eq(format!("a{i}"), i as i64),
                        Expr::is_null(format!("b{i}")),
                    ]));
                }
                black_box(qb.build_parts());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_to_sql, bench_push_bind_list, bench_select_qb);
criterion_main!(benches);
