//! The starter project a new workspace opens with.

use crate::workspace::Workspace;

/// Entry file of the starter project.
pub const STARTER_ENTRY: &str = "src/index.tsx";

const STARTER_FILES: [(&str, &str); 5] = [
    (
        "src/index.tsx",
        r#"import React from "react";
import { createRoot } from "react-dom/client";
import App from "./App.tsx";

const container = document.getElementById("root");

if (!container) {
  throw new Error("Root element #root not found");
}

createRoot(container).render(
  <React.StrictMode>
    <App />
  </React.StrictMode>
);
"#,
    ),
    (
        "src/App.tsx",
        r#"import React from "react";
import HelloWorld from "./components/HelloWorld.tsx";
import Counter from "./components/Counter.tsx";

const App = () => (
  <main>
    <HelloWorld name="ESM Pack" />
    <Counter />
  </main>
);

export default App;
"#,
    ),
    (
        "src/components/HelloWorld.tsx",
        r#"import React from "react";

const HelloWorld = ({ name = "React" }) => (
  <section>
    <h1>Hello, {name}!</h1>
    <p>Welcome to your sandboxed React playground.</p>
  </section>
);

export default HelloWorld;
"#,
    ),
    (
        "src/components/Counter.tsx",
        r#"import React from "react";

const Counter = () => {
  const [count, setCount] = React.useState(0);

  return (
    <section>
      <h2>Counter</h2>
      <p>The button has been clicked {count} times.</p>
      <div>
        <button onClick={() => setCount((value) => value + 1)}>Increment</button>
        <button onClick={() => setCount(0)}>Reset</button>
      </div>
    </section>
  );
};

export default Counter;
"#,
    ),
    (
        "index.txt",
        "Minimal React + TypeScript demo\n\n\
         - src/index.tsx bootstraps the React root and renders <App />.\n\
         - src/App.tsx wires HelloWorld and Counter components.\n\
         - src/components/HelloWorld.tsx greets the user.\n\
         - src/components/Counter.tsx provides an interactive counter demo.\n",
    ),
];

/// A React + TypeScript workspace with two components and a notes file.
pub fn starter() -> Workspace {
    let mut workspace = Workspace::new();
    for (path, content) in STARTER_FILES {
        if let Err(e) = workspace.add(path, content) {
            tracing::warn!(path, error = %e, "Skipping starter file");
        }
    }
    if let Err(e) = workspace.set_entry(STARTER_ENTRY) {
        tracing::warn!(error = %e, "Starter entry missing");
    }
    workspace
}
