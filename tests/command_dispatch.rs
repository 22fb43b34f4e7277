//! 命令调用集成测试：参数校验先于回调、宏声明、内置命令

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ioc_lib::command::{
    register_builtin_commands, ArgBuf, ArgBufWriter, ArgType, CommandRegistry, FuncDef,
};
use ioc_lib::context::{Context, ContextBuilder};
use ioc_lib::models::Value;
use ioc_lib::record::{AnyRecord, BinaryConfig, RecordConfig};
use ioc_lib::register_command;
use ioc_lib::utils::IocError;

fn test_context() -> Context {
    let mut builder = ContextBuilder::new();
    builder.create("AO:1", RecordConfig::ao()).unwrap();
    builder
        .create(
            "BO:1",
            RecordConfig::bo().binary(BinaryConfig::default().names("STOP", "RUN")),
        )
        .unwrap();
    builder
        .create("SI:1", RecordConfig::stringin().initial_value("hello"))
        .unwrap();
    builder.build()
}

/// 注册一个带调用计数器的 (int, double) 命令
fn counted_registry() -> (CommandRegistry, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let tally = calls.clone();
    let registry = CommandRegistry::new();
    registry
        .register(
            FuncDef::builder("mul")
                .arg("a", ArgType::Int)
                .arg("b", ArgType::Double)
                .help("a * b")
                .build(move |_ctx: &Context, args| {
                    tally.fetch_add(1, Ordering::SeqCst);
                    let a: i32 = args.get(0)?;
                    let b: f64 = args.get(1)?;
                    Ok(Value::Double(a as f64 * b))
                }),
        )
        .unwrap();
    (registry, calls)
}

/// 测试参数个数不匹配时回调不会被调用
#[test]
fn test_count_mismatch_never_calls_callback() {
    let ctx = test_context();
    let (registry, calls) = counted_registry();

    let bytes = ArgBufWriter::new().int(2).finish();
    let err = registry
        .invoke(&ctx, "mul", ArgBuf::new(&bytes))
        .unwrap_err();
    assert_eq!(err, IocError::arg_count_mismatch("mul", 2, 1));

    let bytes = ArgBufWriter::new().int(2).double(1.0).int(3).finish();
    let err = registry
        .invoke(&ctx, "mul", ArgBuf::new(&bytes))
        .unwrap_err();
    assert_eq!(err, IocError::arg_count_mismatch("mul", 2, 3));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let bytes = ArgBufWriter::new().int(2).double(1.25).finish();
    let value = registry.invoke(&ctx, "mul", ArgBuf::new(&bytes)).unwrap();
    assert_eq!(value, Value::Double(2.5));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// 测试参数类型不匹配报告位置与期望/实际类型
#[test]
fn test_type_mismatch_reports_position() {
    let ctx = test_context();
    let (registry, calls) = counted_registry();

    let bytes = ArgBufWriter::new().int(2).string("1.0").finish();
    let err = registry
        .invoke(&ctx, "mul", ArgBuf::new(&bytes))
        .unwrap_err();
    assert_eq!(err, IocError::arg_type_mismatch("mul", 1, "double", "string"));

    let bytes = ArgBufWriter::new().double(2.0).double(1.0).finish();
    match registry.invoke(&ctx, "mul", ArgBuf::new(&bytes)) {
        Err(IocError::ArgTypeMismatch {
            position,
            expected,
            found,
            ..
        }) => {
            assert_eq!(position, 0);
            assert_eq!(expected, "int");
            assert_eq!(found, "double");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// 测试损坏的缓冲区在调用前被拒绝
#[test]
fn test_malformed_buffer_is_decode_error() {
    let ctx = test_context();
    let (registry, calls) = counted_registry();

    let mut bytes = ArgBufWriter::new().int(2).double(1.0).finish();
    bytes.truncate(bytes.len() - 3);
    let err = registry
        .invoke(&ctx, "mul", ArgBuf::new(&bytes))
        .unwrap_err();
    assert_eq!(err.error_code(), "ARG_DECODE_ERROR");

    let err = registry
        .invoke(&ctx, "mul", ArgBuf::new(&[9, 0, 0, 0, 0]))
        .unwrap_err();
    assert_eq!(err.error_code(), "ARG_DECODE_ERROR");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// 测试未知命令与未知记录名
#[test]
fn test_unknown_command_and_record() {
    let ctx = test_context();
    let calls = Arc::new(AtomicUsize::new(0));
    let tally = calls.clone();
    let registry = CommandRegistry::new();
    register_command!(registry, fn touch(_ctx, record: AnyRecord) -> String {
        tally.fetch_add(1, Ordering::SeqCst);
        Ok(record.name().to_string())
    })
    .unwrap();

    let err = registry
        .invoke(&ctx, "nothing", ArgBuf::new(&[]))
        .unwrap_err();
    assert_eq!(err, IocError::unknown_command("nothing"));

    let bytes = ArgBufWriter::new().record("NO:SUCH").finish();
    let err = registry
        .invoke(&ctx, "touch", ArgBuf::new(&bytes))
        .unwrap_err();
    assert_eq!(err, IocError::record_not_found("NO:SUCH"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let bytes = ArgBufWriter::new().record("SI:1").finish();
    let value = registry.invoke(&ctx, "touch", ArgBuf::new(&bytes)).unwrap();
    assert_eq!(value, Value::from("SI:1"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// 测试宏按签名生成参数定义，并支持字符串与记录参数
#[test]
fn test_macro_declares_typed_arguments() {
    let ctx = test_context();
    let registry = CommandRegistry::new();
    register_command!(registry, fn greet(_ctx, record: AnyRecord, prefix: &str, suffix: String, times: i32) -> String {
        let text = record.read().value.to_string();
        Ok(format!("{}{}{}", prefix, text.repeat(times.max(0) as usize), suffix))
    })
    .unwrap();

    let def = registry.get("greet").unwrap();
    let types: Vec<ArgType> = def.args().iter().map(|a| a.arg_type).collect();
    assert_eq!(
        types,
        vec![ArgType::RecordName, ArgType::String, ArgType::String, ArgType::Int]
    );
    assert_eq!(def.args()[1].name, "prefix");

    let bytes = ArgBufWriter::new()
        .record("SI:1")
        .string("<")
        .string(">")
        .int(2)
        .finish();
    let value = registry.invoke(&ctx, "greet", ArgBuf::new(&bytes)).unwrap();
    assert_eq!(value, Value::from("<hellohello>"));

    let err = register_command!(registry, fn greet(_ctx) {
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err, IocError::duplicate_command("greet"));
}

/// 测试内置命令：dbpf 按状态名写入开关量，dbgf 读回
#[test]
fn test_builtin_commands_round_trip_through_records() {
    let ctx = test_context();
    let registry = CommandRegistry::new();
    register_builtin_commands(&registry).unwrap();

    let bytes = ArgBufWriter::new().record("BO:1").string("RUN").finish();
    let value = registry.invoke(&ctx, "dbpf", ArgBuf::new(&bytes)).unwrap();
    assert_eq!(value, Value::Bool(true));
    assert_eq!(ctx.lookup("BO:1").unwrap().stats().processed, 1);

    let bytes = ArgBufWriter::new().record("BO:1").finish();
    let value = registry.invoke(&ctx, "dbgf", ArgBuf::new(&bytes)).unwrap();
    assert_eq!(value, Value::Bool(true));

    let bytes = ArgBufWriter::new().record("SI:1").string("x").finish();
    let err = registry
        .invoke(&ctx, "dbpf", ArgBuf::new(&bytes))
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_WRITABLE");

    let value = registry.invoke(&ctx, "dbnr", ArgBuf::new(&[])).unwrap();
    assert_eq!(value, Value::Long(3));

    let bytes = ArgBufWriter::new().record("AO:1").finish();
    let value = registry.invoke(&ctx, "dbproc", ArgBuf::new(&bytes)).unwrap();
    assert_eq!(value, Value::Long(0));
    assert_eq!(ctx.lookup("AO:1").unwrap().stats().processed, 1);

    let names: Vec<String> = registry.list().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["dbgf", "dbnr", "dbpf", "dbproc"]);
}
