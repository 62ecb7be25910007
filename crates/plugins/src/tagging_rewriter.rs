//! 필드 하나와 태그 하나를 설정하는 리라이터

use ironhook_contract::{Lifecycle, PluginError, Rewriter};
use ironhook_core::message::Message;
use ironhook_core::options::OptionLookup;

pub const CLASS: &str = "TaggingRewriter";

/// `field` = `value`를 쓰고 `tag`를 켭니다.
///
/// 기본값: `fruit` = `banana`, 태그 `NewTag`
#[derive(Debug)]
pub struct TaggingRewriter {
    field: String,
    value: String,
    tag: String,
}

impl TaggingRewriter {
    pub fn new() -> Self {
        Self {
            field: "fruit".to_owned(),
            value: "banana".to_owned(),
            tag: "NewTag".to_owned(),
        }
    }
}

impl Default for TaggingRewriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle for TaggingRewriter {
    fn init(&mut self, options: &OptionLookup) -> Result<(), PluginError> {
        let defaults = Self::new();
        self.field = options.get_or("field", &defaults.field);
        self.value = options.get_or("value", &defaults.value);
        self.tag = options.get_or("tag", &defaults.tag);
        Ok(())
    }
}

impl Rewriter for TaggingRewriter {
    fn process(&mut self, msg: &Message) -> Result<bool, PluginError> {
        tracing::debug!(class = CLASS, field = %self.field, tag = %self.tag, "rewrite");
        msg.set_value(&self.field, self.value.as_str())?;
        msg.set_tag(&self.tag, true)?;
        Ok(true)
    }
}
