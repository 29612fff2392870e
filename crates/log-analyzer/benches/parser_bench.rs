//! 접근 로그 파서 벤치마크
//!
//! combined 형식 파서의 라인 단위 처리량과 전체 본문 파싱 성능을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use logscope_log_analyzer::CombinedLogParser;

/// 짧은 라인 (Referer/User-Agent 없음)
const COMMON_LINE: &str =
    r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326"#;

/// 일반적인 combined 라인
const COMBINED_LINE: &str = r#"203.0.113.9 - - [10/Oct/2024:13:55:36 -0700] "GET /index.html HTTP/1.1" 200 2326 "https://news.example/front" "Mozilla/5.0 (X11; Linux x86_64)""#;

/// 긴 쿼리 문자열과 User-Agent를 가진 라인
const LONG_LINE: &str = r#"198.51.100.4 - admin [31/Dec/2024:23:59:59 +0900] "POST /api/v1/users/create?session=eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9&redirect=%2Fdashboard%2Fsettings%2Fsecurity&trace=550e8400-e29b-41d4-a716-446655440000 HTTP/2.0" 201 184467 "https://portal.corp.example/dashboard/settings/security?tab=tokens" "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36""#;

/// 문법에 맞지 않는 라인
const MALFORMED_LINE: &str = "this line is not an access log entry at all";

fn bench_parse_record(c: &mut Criterion) {
    let parser = CombinedLogParser::new().unwrap();

    let mut group = c.benchmark_group("parse_record");
    group.throughput(Throughput::Elements(1));

    for (name, line) in [
        ("common", COMMON_LINE),
        ("combined", COMBINED_LINE),
        ("long", LONG_LINE),
        ("malformed", MALFORMED_LINE),
    ] {
        group.bench_with_input(BenchmarkId::new("line", name), &line, |b, &line| {
            b.iter(|| parser.parse_record(1, black_box(line)).unwrap())
        });
    }

    group.finish();
}

fn bench_parse_str(c: &mut Criterion) {
    let parser = CombinedLogParser::new().unwrap();

    let mut group = c.benchmark_group("parse_str");

    for count in [100usize, 1_000, 10_000] {
        // 10줄마다 1줄은 잘못된 라인
        let text: String = (0..count)
            .map(|i| if i % 10 == 9 { MALFORMED_LINE } else { COMBINED_LINE })
            .collect::<Vec<_>>()
            .join("\n");

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("lines", count), &text, |b, text| {
            b.iter(|| parser.parse_str(black_box(text)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse_record, bench_parse_str);
criterion_main!(benches);
