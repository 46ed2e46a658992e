use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use thicket::owner::{Owner, OwnerTag};
use thicket::Vector;

fn push(c: &mut Criterion) {
    c.bench_function("push 10k shared", |b| {
        b.iter(|| {
            let mut v: Vector<usize> = Vector::new();
            for i in 0..10_000 {
                v.push_mut(OwnerTag::NONE, i);
            }
            black_box(v.len())
        })
    });
    c.bench_function("push 10k owned", |b| {
        b.iter(|| {
            let owner = Owner::new();
            let mut v: Vector<usize> = Vector::new();
            for i in 0..10_000 {
                v.push_mut(owner.tag(), i);
            }
            black_box(v.len())
        })
    });
}

fn get(c: &mut Criterion) {
    let v: Vector<usize> = (0..100_000).collect();
    c.bench_function("get 100k strided", |b| {
        b.iter(|| {
            let mut sum = 0usize;
            let mut i = 0;
            while i < 100_000 {
                sum += v.get(i).copied().unwrap_or(0);
                i += 97;
            }
            black_box(sum)
        })
    });
}

fn concat(c: &mut Criterion) {
    let a: Vector<usize> = (0..10_000).collect();
    let b_half: Vector<usize> = (10_000..20_000).collect();
    c.bench_function("concat 10k + 10k", |b| {
        b.iter(|| black_box(a.concat(OwnerTag::NONE, &b_half).len()))
    });
    c.bench_function("slice 20k middle", |b| {
        let joined = a.concat(OwnerTag::NONE, &b_half);
        b.iter(|| black_box(joined.slice(OwnerTag::NONE, 137, 19_411).len()))
    });
}

criterion_group!(benches, push, get, concat);
criterion_main!(benches);
