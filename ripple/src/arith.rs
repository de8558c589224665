use anyhow::{anyhow, bail};
use ripple_rpc::Service;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArithArgs {
    pub a: i64,
    pub b: i64,
}

impl ArithArgs {
    pub fn new(a: i64, b: i64) -> Self {
        Self { a, b }
    }
}

/// Integer arithmetic under `Arith.Add`, `Arith.Sub`, `Arith.Mul` and
/// `Arith.Div`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Arith;

impl Service for Arith {
    type Args = ArithArgs;
    type Reply = i64;

    async fn call(&self, service_method: &str, args: ArithArgs) -> anyhow::Result<i64> {
        let ArithArgs { a, b } = args;
        let reply = match service_method {
            "Arith.Add" => a.checked_add(b),
            "Arith.Sub" => a.checked_sub(b),
            "Arith.Mul" => a.checked_mul(b),
            "Arith.Div" => {
                if b == 0 {
                    bail!("divide by zero");
                }
                a.checked_div(b)
            }
            _ => bail!("rpc: can't find method {service_method}"),
        };
        reply.ok_or_else(|| anyhow!("{service_method}: integer overflow"))
    }
}
