mod chat_completion;
mod fixture;
mod http_query;

pub use chat_completion::{parse_completion, ChatCompletionNarrator, NARRATIVE_API_KEY_ENV};
pub use fixture::FixtureQueryService;
pub use http_query::{
    parse_table_body, HttpQueryService, QueryServiceConfig, QUERY_COOKIE_ENV, QUERY_ENDPOINT_ENV,
};
