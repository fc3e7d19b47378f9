/// Read-through caching around an async computation.
///
/// `$cache` is an `Option<&Cache>`; with `None` the block simply runs. On a
/// hit the cached value is returned; on a miss the block's value is queued
/// for writing with `$ttl` seconds to live and returned.
///
/// Cache read failures are logged and treated as a miss, so an unavailable
/// Redis never fails the request.
///
/// # Example
/// ```rust,ignore
/// let search: PlaceSearch = cached!(self.cache.as_ref(), key, ttl, async {
///     self.fetch(params).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache {
            Some(cache) => {
                let hit = match cache.get_from_cache(&$key).await {
                    Ok(hit) => hit,
                    Err(e) => {
                        tracing::warn!(key = %$key, error = %e, "Cache read failed, computing value");
                        None
                    }
                };
                match hit {
                    Some(value) => Ok(value),
                    None => match $block.await {
                        Ok(value) => {
                            cache.set_in_background(&$key, &value, $ttl);
                            Ok(value)
                        }
                        Err(e) => Err(e),
                    },
                }
            }
            None => $block.await,
        }
    }};
}
