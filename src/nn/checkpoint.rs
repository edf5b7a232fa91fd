/*
 * @Description  : 权重文件读写（纯二进制序列化）
 *
 * 文件格式：
 * - Header: magic(4, "GCNN") + version(4, u32 小端)
 * - Body:   bincode 编码的`(name, shape, data)`列表，顺序与网络一致
 *
 * 名称/形状与目标网络的比对不在此处进行，见`Network::load_state_dict`
 */

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::{StateDict, StateEntry};
use crate::errors::ModelError;

/// 权重文件魔数
pub const CHECKPOINT_MAGIC: &[u8; 4] = b"GCNN";
/// 权重文件版本
pub const CHECKPOINT_VERSION: u32 = 1;

/// 把权重状态写入`path`
pub fn save_state_dict<P: AsRef<Path>>(state: &StateDict, path: P) -> Result<(), ModelError> {
    let file = File::create(path.as_ref())
        .map_err(|e| ModelError::Format(format!("无法创建权重文件: {e}")))?;
    let mut writer = BufWriter::new(file);
    write_state_dict(state, &mut writer)?;
    writer
        .flush()
        .map_err(|e| ModelError::Format(format!("刷新缓冲区失败: {e}")))?;
    log::debug!(
        "已保存 {} 个张量到权重文件 {}",
        state.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// 从`path`读取权重状态
pub fn load_state_dict<P: AsRef<Path>>(path: P) -> Result<StateDict, ModelError> {
    let file = File::open(path.as_ref())
        .map_err(|e| ModelError::Format(format!("无法打开权重文件: {e}")))?;
    read_state_dict(BufReader::new(file))
}

pub fn write_state_dict<W: Write>(state: &StateDict, mut writer: W) -> Result<(), ModelError> {
    writer
        .write_all(CHECKPOINT_MAGIC)
        .map_err(|e| ModelError::Format(format!("写入魔数失败: {e}")))?;
    writer
        .write_all(&CHECKPOINT_VERSION.to_le_bytes())
        .map_err(|e| ModelError::Format(format!("写入版本失败: {e}")))?;
    bincode::serialize_into(&mut writer, state.entries())
        .map_err(|e| ModelError::Format(format!("写入权重数据失败: {e}")))
}

pub fn read_state_dict<R: Read>(mut reader: R) -> Result<StateDict, ModelError> {
    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|e| ModelError::Format(format!("读取魔数失败: {e}")))?;
    if &magic != CHECKPOINT_MAGIC {
        return Err(ModelError::Format(
            "无效的权重文件：缺少 GCNN 文件头，请确保使用 save_checkpoint() 保存的文件".to_string(),
        ));
    }

    let mut version_bytes = [0u8; 4];
    reader
        .read_exact(&mut version_bytes)
        .map_err(|e| ModelError::Format(format!("读取版本失败: {e}")))?;
    let version = u32::from_le_bytes(version_bytes);
    if version != CHECKPOINT_VERSION {
        return Err(ModelError::Format(format!(
            "不支持的权重文件版本: {version}"
        )));
    }

    let entries: Vec<StateEntry> = bincode::deserialize_from(&mut reader)
        .map_err(|e| ModelError::Format(format!("权重数据已损坏: {e}")))?;
    if let Some(bad) = entries.iter().find(|e| !e.is_consistent()) {
        return Err(ModelError::Format(format!(
            "张量 {} 的数据长度 {} 与形状 {:?} 不符",
            bad.name,
            bad.data.len(),
            bad.shape
        )));
    }
    Ok(StateDict::from_entries(entries))
}
