use talentrag_core::error::{Error, ProviderErrorKind};
use talentrag_core::traits::{CompletionParams, LanguageModel};
use talentrag_llm::{parse_structured, ScriptedModel};

#[tokio::test]
async fn scripted_model_replays_in_order_then_fails() {
    let model = ScriptedModel::with_replies(["first", "second"]);
    let p = CompletionParams::new(0.1, 50);
    assert_eq!(model.complete(None, "a", p).await.expect("first"), "first");
    assert_eq!(model.complete(Some("sys"), "b", p).await.expect("second"), "second");
    let err = model.complete(None, "c", p).await.unwrap_err();
    assert!(matches!(err, Error::Provider { kind: ProviderErrorKind::Unavailable, .. }));
    assert_eq!(model.calls(), 3);

    let log = model.recorded();
    assert_eq!(log[1].system.as_deref(), Some("sys"));
    assert_eq!(log[2].prompt, "c");
}

#[tokio::test]
async fn scripted_errors_and_fallback_reply() {
    let model = ScriptedModel::always("ok");
    model.push_error(Error::provider(ProviderErrorKind::RateLimited, "slow down"));
    let p = CompletionParams::new(0.7, 1500);
    assert!(model.complete(None, "x", p).await.is_err());
    assert_eq!(model.complete(None, "x", p).await.expect("fallback"), "ok");
    assert_eq!(model.recorded()[0].params, p);
}

#[tokio::test]
async fn scripted_reply_parses_as_skill_list() {
    let model = ScriptedModel::with_replies(["```json\n[\"Python\", \"AWS\"]\n```"]);
    let reply = model.complete(None, "skills", CompletionParams::new(0.1, 500)).await.expect("reply");
    let skills: Vec<String> = parse_structured(&reply).expect("skills");
    assert_eq!(skills, vec!["Python", "AWS"]);
}
