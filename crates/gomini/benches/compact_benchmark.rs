use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gomini::lexer::Lexer;
use gomini::{compact_to_vec, diff, examine, parse_file, CompactOptions};
use std::hint::black_box as bb;

// =============================================================================
// Inputs
// =============================================================================

const SMALL_HELLO_WORLD: &str = r#"package main

import "fmt"

func main() {
	fmt.Println("Hello, World!")
}
"#;

const MEDIUM_STRUCT_METHODS: &str = r#"package geometry // import "example.com/geometry"

import "math"

// Point is a location in the plane.
type Point struct {
	X, Y float64
}

func (p Point) Abs() float64 {
	return math.Sqrt(p.X*p.X + p.Y*p.Y)
}

func (p *Point) Scale(f float64) {
	p.X = p.X * f
	p.Y = p.Y * f
}

type Rectangle struct {
	Min, Max Point
}

func (r Rectangle) Area() float64 {
	return (r.Max.X - r.Min.X) * (r.Max.Y - r.Min.Y)
}
"#;

const LARGE_GENERICS_AND_CONTROL: &str = r#"package compiler

import (
	"errors"
	"fmt"
	"strings"
)

type Number interface {
	~int | ~int64 | ~float64
}

func Sum[T Number](xs ...T) (total T) {
	for _, x := range xs {
		total += x
	}
	return
}

type Stack[T any] struct {
	items []T
}

func (s *Stack[T]) Push(v T) { s.items = append(s.items, v) }

func (s *Stack[T]) Pop() (T, bool) {
	var zero T
	if len(s.items) == 0 {
		return zero, false
	}
	v := s.items[len(s.items)-1]
	s.items = s.items[:len(s.items)-1]
	return v, true
}

var ErrEmpty = errors.New("empty")

func classify(tokens []string) (map[string]int, error) {
	if len(tokens) == 0 {
		return nil, ErrEmpty
	}
	counts := make(map[string]int, len(tokens))
	for i := 0; i < len(tokens); i++ {
		switch t := strings.TrimSpace(tokens[i]); {
		case t == "":
			continue
		case strings.HasPrefix(t, "//"):
			counts["comment"]++
		default:
			counts[t]++
		}
	}
	return counts, nil
}

func pump(in <-chan int, out chan<- string, done chan struct{}) {
	for {
		select {
		case v, ok := <-in:
			if !ok {
				close(out)
				return
			}
			out <- fmt.Sprintf(`value %d`, v)
		case <-done:
			return
		}
	}
}
"#;

fn inputs() -> [(&'static str, &'static str); 3] {
    [
        ("small", SMALL_HELLO_WORLD),
        ("medium", MEDIUM_STRUCT_METHODS),
        ("large", LARGE_GENERICS_AND_CONTROL),
    ]
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_lex(c: &mut Criterion) {
    let mut group = c.benchmark_group("lex");
    for (name, src) in inputs() {
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), src, |b, src| {
            b.iter(|| Lexer::with_comments(bb(src)).count())
        });
    }
    group.finish();
}

fn bench_compact(c: &mut Criterion) {
    let mut group = c.benchmark_group("compact");
    for (name, src) in inputs() {
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), src, |b, src| {
            b.iter(|| compact_to_vec(bb(src.as_bytes()), CompactOptions::default()))
        });
    }
    group.finish();
}

fn bench_examine(c: &mut Criterion) {
    let mut group = c.benchmark_group("examine");
    for (name, src) in inputs() {
        let Ok(out) = compact_to_vec(src.as_bytes(), CompactOptions::default()) else {
            continue;
        };
        group.throughput(Throughput::Bytes(out.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &out, |b, out| {
            b.iter(|| examine(bb(out)))
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, src) in inputs() {
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), src, |b, src| {
            b.iter(|| parse_file(bb(src)))
        });
    }
    group.finish();
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");
    for (name, src) in inputs() {
        let Ok(out) = compact_to_vec(src.as_bytes(), CompactOptions::default()) else {
            continue;
        };
        let compacted = String::from_utf8_lossy(&out).into_owned();
        let (Ok(a), Ok(b)) = (parse_file(src), parse_file(&compacted)) else {
            continue;
        };
        group.bench_function(BenchmarkId::from_parameter(name), |bench| {
            bench.iter(|| diff(Some(bb(a.root())), Some(bb(b.root()))).0.is_none())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_lex,
    bench_compact,
    bench_examine,
    bench_parse,
    bench_diff
);
criterion_main!(benches);
