//! System prompts and user-message builders for each recommendation call.

use bookmatch_core::domain::book::{OwnedBook, TentativeBook};

pub const RECOMMENDATION: &str = r#"당신은 전문 북큐레이터입니다. 사용자 질문과 보유도서 목록을 보고 질문에 가장 적합한 책을 골라주세요.

출력은 아래 구조의 JSON 객체 하나입니다. 다른 문장이나 마크다운을 덧붙이지 마세요.
{"owned_books": [{"title": "도서명", "author": "저자명"}], "new_books": [{"title": "도서명", "author": "저자명"}]}

- owned_books: 보유도서 중 질문에 맞는 0-3권. 입력에 적힌 도서명과 저자명을 그대로 옮겨 적으세요.
- new_books: 보유도서에 없는 신규 추천 1-3권.
- 실제로 출간된 한국어 도서만 추천하고 절판 도서는 제외하세요.
- 자기계발은 구체적 방법론을, 심리는 전문가 저술을, 학문은 검증된 입문서를 우선하세요."#;

pub const OWNED_RECOMMENDATION: &str = r#"당신은 전문 북큐레이터입니다. 사용자가 가진 책 목록을 보고, 이 독자가 다음에 읽으면 좋을 새 책을 추천해주세요.

출력은 아래 구조의 JSON 객체 하나입니다. 다른 문장이나 마크다운을 덧붙이지 마세요.
{"books": [{"title": "도서명", "author": "저자명"}]}

- 보유도서와 같은 책은 추천하지 마세요.
- 실제로 출간된 한국어 도서 1-5권만 추천하세요."#;

pub const REPLACEMENT: &str = r#"당신은 전문 북큐레이터입니다. 사용자 질문에 맞는 새 책을 한 권만 추천해주세요.

출력은 아래 구조의 JSON 객체 하나입니다. 다른 문장이나 마크다운을 덧붙이지 마세요.
{"title": "도서명", "author": "저자명"}

- 이미 시도한 도서 목록에 있는 책은 절대 추천하지 마세요.
- 실제로 출간된 한국어 도서만 추천하세요."#;

pub const DESCRIPTION: &str = r#"당신은 전문 북큐레이터입니다. 질문과 그 질문에 대해 선정된 도서 목록을 받아, 각 도서를 고른 이유를 설명해주세요.

- 도서마다 문단을 나누어 핵심 주제, 질문과의 연관성, 독자가 얻을 수 있는 도움을 적으세요.
- 실제 도서 내용에 근거해 전문적이고 논리적인 어조로 쓰세요."#;

fn labels<'a>(books: impl IntoIterator<Item = &'a TentativeBook>) -> String {
    books.into_iter().map(TentativeBook::label).collect::<Vec<_>>().join(", ")
}

pub fn recommendation_input(question: &str, owned_books: &[OwnedBook]) -> String {
    let owned: Vec<TentativeBook> = owned_books.iter().map(OwnedBook::as_tentative).collect();
    format!("질문: {question}\n보유도서: [{}]", labels(&owned))
}

pub fn owned_recommendation_input(owned_books: &[OwnedBook]) -> String {
    let owned: Vec<TentativeBook> = owned_books.iter().map(OwnedBook::as_tentative).collect();
    format!("보유도서 제목-저자 목록: [{}]", labels(&owned))
}

pub fn replacement_input(question: &str, previously_tried: &[TentativeBook]) -> String {
    let titles: Vec<&str> = previously_tried.iter().map(|book| book.title.as_str()).collect();
    format!("질문: {question}\n이미 시도한 도서 제목: [{}]", titles.join(", "))
}

pub fn description_input(question: &str, books: &[TentativeBook]) -> String {
    format!("질문: {question}\n해당 질문에 대해 선정된 도서 목록: {}", labels(books))
}
