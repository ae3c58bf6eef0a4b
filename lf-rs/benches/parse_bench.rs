use criterion::{black_box, criterion_group, criterion_main, Criterion};

use lf::parse::parse_all;
use lf::App;

fn make_rc(repeats: usize) -> String {
    let chunk = "\
set tabstop 4
set ratios 1:2:3
map gh cd ~
map x $rm -rf \"$f\"
cmd open ${{
    $OPENER \"$f\"
}}
echo 'loaded'; echomsg \"done\" # trailing comment
";
    chunk.repeat(repeats)
}

fn bench_parse(c: &mut Criterion) {
    let small = make_rc(10);
    let large = make_rc(1000);

    let mut g = c.benchmark_group("parse");
    g.bench_function("rc_small", |b| b.iter(|| parse_all(black_box(&small))));
    g.bench_function("rc_large", |b| b.iter(|| parse_all(black_box(&large))));
    g.finish();
}

fn bench_eval(c: &mut Criterion) {
    let app = App::new();
    let text = "set tabstop 4; set number; set ratios 1:2:3";

    c.bench_function("eval_set", |b| {
        b.iter(|| app.eval_text(black_box(text)));
    });

    let mut scripted = App::new();
    scripted.init_script();
    let eng = scripted.script().cloned();
    c.bench_function("lua_get_set", |b| {
        b.iter(|| {
            if let Some(eng) = &eng {
                let _ = eng.exec(black_box("lf.set('tabstop', lf.get('tabstop'))"));
            }
        })
    });
}

criterion_group!(benches, bench_parse, bench_eval);
criterion_main!(benches);
