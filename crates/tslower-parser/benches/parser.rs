//! Parser and transform benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tslower_parser::{parse, transform, ParserOptions, TransformOptions};

const SAMPLE_SOURCE: &str = r#"
import { Widget, type Props } from "./widget";

export namespace Geometry {
    export interface Point { x: number; y: number }
    export const origin: Point = { x: 0, y: 0 };
    export function distance(a: Point, b: Point = origin): number {
        return Math.sqrt((a.x - b.x) ** 2 + (a.y - b.y) ** 2);
    }
}

export enum Direction { Up = 1, Down, Left = Up << 4, Right = Left + 1 }

abstract class Shape<T extends object = {}> {
    constructor(protected readonly name: string, private scale = 1) {}
    abstract area(): number;
    describe<U>(this: Shape<T>, extra?: U): string {
        return `${this.name}: ${this.area() * this.scale}`;
    }
}

class Circle extends Shape {
    constructor(public radius: number) { super("circle"); }
    area() { return Math.PI * this.radius ** 2; }
}

const parse = async <T,>(input: string): Promise<T> => JSON.parse(input) as T;
const lookup = new Map<string, Array<[number, Direction]>>();
const ok = f<number>(1) && a < b && c > (d as any);
const widget = new Widget({ kind: Direction.Up } satisfies Props);
"#;

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");
    group.throughput(Throughput::Bytes(SAMPLE_SOURCE.len() as u64));

    group.bench_function("parse", |b| {
        b.iter(|| parse(black_box(SAMPLE_SOURCE), ParserOptions::default()));
    });

    group.bench_function("transform", |b| {
        b.iter(|| transform(black_box(SAMPLE_SOURCE), TransformOptions::default()));
    });

    group.finish();
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
