use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use ultrarender::render::ChunkBuffer;
use ultrarender::{ImportMap, ImportMapResolver};
use url::Url;

fn example_map() -> ImportMap {
    let mut map = ImportMap::new()
        .with_import("react", "https://esm.sh/react@18.2.0")
        .with_import("react-dom/", "https://esm.sh/react-dom@18.2.0/")
        .with_import("fmt/", "https://deno.land/std@0.134.0/fmt/")
        .with_import("#/", "./src/")
        .with_import("/", "./")
        .with_import("ultra/", "https://deno.land/x/ultra/src/")
        .with_scoped_import("https://deno.land/x/ultra/", "ultra/react/root.tsx", "./src/root.tsx")
        .with_scoped_import("https://esm.sh/", "react", "https://esm.sh/react@18.2.0?pin");
    for i in 0..200 {
        map = map.with_import(format!("pkg-{i}/"), format!("https://cdn.dev/pkg-{i}@1.0.0/"));
    }
    map
}

fn bench_resolve(c: &mut Criterion) {
    let base = Url::parse("file:///project/").unwrap();
    let resolver = ImportMapResolver::new(example_map(), base.clone());
    let framework = Url::parse("https://deno.land/x/ultra/src/render.tsx").unwrap();
    let app = Url::parse("file:///project/src/components/nav/Nav.tsx").unwrap();

    c.bench_function("resolve_specifiers", |b| {
        let cases = [
            ("react", &base),
            ("react-dom/client", &app),
            ("fmt/colors.ts?v=2", &app),
            ("#/components/pages/Home.tsx", &app),
            ("ultra/react/root.tsx", &framework),
            ("ultra/react/context.tsx", &framework),
            ("pkg-150/lib/index.js", &app),
            ("./sibling.tsx", &app),
        ];
        b.iter(|| {
            for (specifier, referrer) in cases.iter() {
                let res = resolver.resolve(specifier, referrer);
                black_box(&res);
            }
        })
    });
}

fn bench_chunk_buffer(c: &mut Criterion) {
    let fragment = vec![b'x'; 700];
    c.bench_function("chunk_buffer_push", |b| {
        b.iter(|| {
            let mut buffer = ChunkBuffer::new(8 * 1024);
            let mut emitted = 0;
            for _ in 0..64 {
                emitted += buffer.push(black_box(&fragment)).len();
            }
            emitted += usize::from(buffer.flush().is_some());
            black_box(emitted)
        })
    });
}

criterion_group!(benches, bench_resolve, bench_chunk_buffer);
criterion_main!(benches);
