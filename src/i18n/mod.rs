//! 多语言错误消息模块
//!
//! 使用rat_embed_lang框架提供统一的错误消息多语言支持

use std::collections::HashMap;
use rat_embed_lang::register_translations;

/// 错误消息翻译注册器
pub struct ErrorMessageI18n;

/// 插入一组三语翻译
fn insert_message(
    translations: &mut HashMap<String, HashMap<String, String>>,
    key: &str,
    zh: &str,
    en: &str,
    ja: &str,
) {
    let mut messages = HashMap::new();
    messages.insert("zh-CN".to_string(), zh.to_string());
    messages.insert("en-US".to_string(), en.to_string());
    messages.insert("ja-JP".to_string(), ja.to_string());
    translations.insert(key.to_string(), messages);
}

impl ErrorMessageI18n {
    /// 注册所有错误消息翻译
    pub fn register_all_translations() {
        let mut translations = HashMap::new();

        // 远程后端
        insert_message(
            &mut translations,
            "error.remote_connect",
            "远程缓存连接失败: {url} - {message}",
            "Remote cache connection failed: {url} - {message}",
            "リモートキャッシュ接続失敗: {url} - {message}",
        );
        insert_message(
            &mut translations,
            "error.remote_ping",
            "远程缓存存活探测失败: {url} - {message}",
            "Remote cache liveness probe failed: {url} - {message}",
            "リモートキャッシュの死活確認失敗: {url} - {message}",
        );

        // 磁盘后端
        insert_message(
            &mut translations,
            "error.disk_path",
            "磁盘缓存目录不可写: {path} - {message}",
            "Disk cache directory is not writable: {path} - {message}",
            "ディスクキャッシュディレクトリに書き込めません: {path} - {message}",
        );
        insert_message(
            &mut translations,
            "error.disk_open",
            "磁盘缓存打开失败: {path} - {message}",
            "Failed to open disk cache: {path} - {message}",
            "ディスクキャッシュを開けません: {path} - {message}",
        );

        // 后端回退
        insert_message(
            &mut translations,
            "warn.backend_fallback",
            "缓存后端 {backend} 不可用，回退到 {next}: {message}",
            "Cache backend {backend} unavailable, falling back to {next}: {message}",
            "キャッシュバックエンド {backend} が利用不可、{next} にフォールバック: {message}",
        );

        // 序列化
        insert_message(
            &mut translations,
            "error.encode",
            "缓存值编码失败: {message}",
            "Failed to encode cache value: {message}",
            "キャッシュ値のエンコード失敗: {message}",
        );

        // 批处理
        insert_message(
            &mut translations,
            "error.batch_flush",
            "批处理刷新失败: 批次={batch_key} - {message}",
            "Batch flush failed: batch={batch_key} - {message}",
            "バッチフラッシュ失敗: バッチ={batch_key} - {message}",
        );
        insert_message(
            &mut translations,
            "error.batch_closed",
            "批处理调度器已关闭: 批次={batch_key}",
            "Batch scheduler is closed: batch={batch_key}",
            "バッチスケジューラは停止しています: バッチ={batch_key}",
        );

        // 配置
        insert_message(
            &mut translations,
            "error.config_file",
            "解析配置文件失败: {path} - {message}",
            "Failed to parse config file: {path} - {message}",
            "設定ファイルの解析失敗: {path} - {message}",
        );

        // 查询安全
        insert_message(
            &mut translations,
            "error.unsafe_statement",
            "拒绝执行不安全的语句: {message}",
            "Refusing to execute unsafe statement: {message}",
            "安全でないステートメントの実行を拒否: {message}",
        );

        // 注册所有翻译
        register_translations(translations);
    }

    /// 初始化错误消息多语言支持
    pub fn init() {
        Self::register_all_translations();

        // 从环境变量获取语言设置，默认为zh-CN
        let lang = std::env::var("RAT_LANG")
            .or_else(|_| std::env::var("LANG"))
            .unwrap_or_else(|_| "zh-CN".to_string());

        // 标准化语言代码
        use rat_embed_lang::normalize_language_code;
        let normalized_lang = normalize_language_code(&lang);
        set_language(&normalized_lang);
    }
}

/// 重新导出rat_embed_lang的核心函数
pub use rat_embed_lang::{t, tf, set_language, current_language};
