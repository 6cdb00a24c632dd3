use tracing::debug;

use crate::{Result, ToolContext};

/// コンテナ内の Blob をメタデータの JSON 配列（整形済み）として返す
///
/// 並び順は列挙された順のまま。
pub async fn list_blobs(ctx: &ToolContext, container_name: &str) -> Result<String> {
    let container = ctx.connect(container_name)?;

    if !container.exists().await? {
        return Err(crate::Error::container_not_found(container_name));
    }

    let blobs = container.list_blobs().await?;
    debug!("Listed {} blobs in {}", blobs.len(), container_name);

    Ok(serde_json::to_string_pretty(&blobs)?)
}
