#![no_main]

use libfuzzer_sys::fuzz_target;
use logscope_log_analyzer::CombinedLogParser;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(parser) = CombinedLogParser::new() else {
        return;
    };

    // 크래시나 패닉 없이 Ok 또는 Err을 반환해야 한다
    if let Ok(outcome) = parser.parse_str(text) {
        // 비어 있지 않은 모든 라인은 레코드 또는 건너뛴 라인으로 집계된다
        let non_blank = text.lines().filter(|l| !l.trim().is_empty()).count();
        assert_eq!(outcome.total_lines(), non_blank);
    }
});
