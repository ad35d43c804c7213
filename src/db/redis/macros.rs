/// Returns the cached value for a key, or computes and caches it.
///
/// On a hit the deserialized value is returned. On a miss the future is
/// awaited, the result is queued for the background writer and returned.
/// A failed cache read is logged and treated as a miss, so an unreachable
/// Redis only costs the cache. Errors from the future propagate with `?`,
/// which limits the macro to functions returning `AppResult`.
///
/// # Arguments
/// * `$cache`: a `Cache` (anything with `get_from_cache` and `set_in_background`).
/// * `$key`: the `CacheKey` to read and write.
/// * `$ttl`: time-to-live for a fresh value, in seconds.
/// * `$block`: the future that computes the value on a miss.
///
/// # Example
/// ```rust,ignore
/// async fn weather(&self, cache: &Cache, date: NaiveDate) -> AppResult<WeatherSnapshot> {
///     let key = CacheKey::Weather { city: "Tokyo,JP".into(), date };
///     cached!(cache, key, 1800, self.fetch(date))
/// }
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let hit = match $cache.get_from_cache(&$key).await {
            Ok(hit) => hit,
            Err(e) => {
                ::tracing::warn!(key = %$key, error = %e, "Cache read failed, bypassing cache");
                None
            }
        };
        match hit {
            Some(cached) => Ok(cached),
            None => {
                let value = $block.await?;
                $cache.set_in_background(&$key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
