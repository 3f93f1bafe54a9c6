//! Lua scripts for atomic Redis operations
//!
//! Redis has no conditional SET against an arbitrary prior value, so the
//! check-and-set the atomic mutator builds on is a server-side script:
//! read, compare, and conditionally write in one indivisible step.
//! Scripts are compiled once and cached by name.

use parking_lot::RwLock;
use redis::Script;
use std::collections::HashMap;
use std::sync::Arc;

/// Cache of compiled Lua scripts
pub struct LuaScripts {
    cache: RwLock<HashMap<String, Arc<Script>>>,
}

impl LuaScripts {
    /// Create an empty script cache
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_create(&self, name: &str, lua: &str) -> Arc<Script> {
        {
            let cache = self.cache.read();
            if let Some(script) = cache.get(name) {
                return Arc::clone(script);
            }
        }

        let script = Arc::new(Script::new(lua));
        self.cache
            .write()
            .insert(name.to_string(), Arc::clone(&script));
        script
    }

    /// Conditional write: apply the new value only if the key's current
    /// value matches the expectation
    ///
    /// # Keys
    /// - KEYS[1]: target key
    ///
    /// # Arguments
    /// - ARGV[1]: expected current value (ignored when ARGV[2] is '0')
    /// - ARGV[2]: '1' if an expected value is supplied, '0' if the key
    ///   must be absent
    /// - ARGV[3]: new value
    ///
    /// # Returns
    /// - 1 if the write was applied
    /// - 0 on mismatch, with no side effects
    pub fn check_and_set(&self) -> Arc<Script> {
        self.get_or_create(
            "check_and_set",
            r#"
            local current = redis.call('GET', KEYS[1])

            if ARGV[2] == '1' then
                if current == ARGV[1] then
                    redis.call('SET', KEYS[1], ARGV[3])
                    return 1
                end
                return 0
            end

            if current == false then
                redis.call('SET', KEYS[1], ARGV[3])
                return 1
            end
            return 0
            "#,
        )
    }
}

impl Default for LuaScripts {
    fn default() -> Self {
        Self::new()
    }
}
