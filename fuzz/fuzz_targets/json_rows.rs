#![no_main]

use libfuzzer_sys::fuzz_target;
use logscope_log_analyzer::RecordStore;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // 임의의 JSON 입력은 레코드 집합 또는 에러가 되어야 하며 패닉하지 않는다
    if let Ok(store) = RecordStore::from_json_str(text) {
        let _ = store.to_json_lines();
    }
    if let Ok(store) = RecordStore::from_json_lines(text) {
        for column in store.columns() {
            assert!(store.has_column(*column));
        }
    }
});
