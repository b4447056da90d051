//! jq pre-filtering of input documents before decoding.
use anyhow::{anyhow, Context, Result};
use jaq_core::{load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// Run `filter_src` over `input`; every output becomes one document to decode.
pub fn select_documents(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(|errs| {
        let reasons: Vec<String> = errs.iter().map(|(_, err)| format!("{err:?}")).collect();
        anyhow!("jq filter `{filter_src}` does not parse: {}", reasons.join("; "))
    })?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(|errs| {
            let names: Vec<&str> =
                errs.iter().flat_map(|(_, undefined)| undefined.iter().map(|(name, _)| *name)).collect();
            anyhow!("jq filter `{filter_src}` uses undefined {}", names.join(", "))
        })?;

    let inputs = RcIter::new(core::iter::empty());
    let outputs = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    outputs
        .map(|item| {
            let v = item.map_err(|e| anyhow!("jq filter `{filter_src}` failed: {e:?}"))?;
            serde_json::from_str(&v.to_string()).with_context(|| format!("jq output is not JSON: {v}"))
        })
        .collect()
}
